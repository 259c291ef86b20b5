//! Operation counters.
//!
//! Every unit of work (one scenario build, one pair evaluation) owns an
//! [`OperationCounts`] value. Batches sum the per-unit values afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Number of contracts built, compositions and merges performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    /// Atomic contracts built from templates.
    pub contracts: u64,
    /// Sequential compositions.
    pub compositions: u64,
    /// Viewpoint and requirement merges.
    pub merges: u64,
}

impl OperationCounts {
    pub fn new(contracts: u64, compositions: u64, merges: u64) -> Self {
        Self {
            contracts,
            compositions,
            merges,
        }
    }

    /// Total number of operations.
    pub fn total(&self) -> u64 {
        self.contracts + self.compositions + self.merges
    }
}

impl Add for OperationCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            contracts: self.contracts + rhs.contracts,
            compositions: self.compositions + rhs.compositions,
            merges: self.merges + rhs.merges,
        }
    }
}

impl AddAssign for OperationCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for OperationCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a OperationCounts> for OperationCounts {
    fn sum<I: Iterator<Item = &'a OperationCounts>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for OperationCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} contracts, {} compositions, and {} merges",
            self.contracts, self.compositions, self.merges
        )
    }
}
