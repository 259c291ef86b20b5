//! Sequential composition of step contracts.
//!
//! `sequence(c1, c2, vars, i)` glues step `i` of `c1` to step `i + 1` of
//! `c2`: each `v{i+1}_entry` of `c2` is renamed to `v{i}_exit`, the two
//! contracts are composed keeping those names visible, and the kept names
//! become `output_v{i}`.
//!
//! [`chain`](ContractFactory::chain) folds a whole list of links. The fold
//! direction changes how much work each composition does, not the result.

use serde::{Deserialize, Serialize};

use crate::algebra::{Contract, ContractAlgebra};
use crate::error::ContractError;
use crate::factory::{ContractFactory, StateVar};

/// Order in which [`chain`](ContractFactory::chain) composes its links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldDirection {
    /// `((l1 ; l2) ; l3) ; …`
    LeftToRight,
    /// `l1 ; (l2 ; (l3 ; …))`
    #[default]
    RightToLeft,
}

/// One element of a chain: a contract and the index of its last step.
#[derive(Debug, Clone)]
pub struct ChainLink {
    pub last_step: usize,
    pub contract: Contract,
}

impl ChainLink {
    pub fn new(last_step: usize, contract: Contract) -> Self {
        Self {
            last_step,
            contract,
        }
    }
}

impl<'a, A: ContractAlgebra> ContractFactory<'a, A> {
    /// Composes `c1` (ending at step `i`) with `c2` (starting at `i + 1`).
    pub fn sequence(
        &mut self,
        c1: &Contract,
        c2: &Contract,
        vars: &[StateVar],
        i: usize,
    ) -> Result<Contract, ContractError> {
        self.sequence_steps(c1, c2, vars, i, i + 1)
    }

    /// Like [`sequence`](Self::sequence) with an explicit start step `j`
    /// for `c2`.
    pub fn sequence_steps(
        &mut self,
        c1: &Contract,
        c2: &Contract,
        vars: &[StateVar],
        i: usize,
        j: usize,
    ) -> Result<Contract, ContractError> {
        let algebra = self.algebra();
        let bound: Vec<StateVar> = vars
            .iter()
            .copied()
            .filter(|v| c1.has_output(&v.exit(i)) && c2.has_input(&v.entry(j)))
            .collect();

        let to_exits: Vec<(String, String)> =
            bound.iter().map(|v| (v.entry(j), v.exit(i))).collect();
        let keep: Vec<String> = bound.iter().map(|v| v.exit(i)).collect();
        let to_outputs: Vec<(String, String)> =
            bound.iter().map(|v| (v.exit(i), v.output(i))).collect();

        let c2 = algebra.rename(c2, &to_exits)?;
        let composed = algebra.compose(c1, &c2, &keep)?;
        let composed = algebra.rename(&composed, &to_outputs)?;
        self.counts_mut().compositions += 1;
        Ok(composed)
    }

    /// Folds `links` into one contract, each link sequenced to the next on
    /// `vars`.
    pub fn chain(
        &mut self,
        links: Vec<ChainLink>,
        vars: &[StateVar],
        fold: FoldDirection,
    ) -> Result<Contract, ContractError> {
        match fold {
            FoldDirection::LeftToRight => {
                let mut links = links.into_iter();
                let Some(first) = links.next() else {
                    return Err(ContractError::malformed("cannot chain an empty list of contracts"));
                };
                let mut acc = first;
                for link in links {
                    let contract =
                        self.sequence(&acc.contract, &link.contract, vars, acc.last_step)?;
                    acc = ChainLink::new(link.last_step, contract);
                }
                Ok(acc.contract)
            }
            FoldDirection::RightToLeft => {
                let mut links = links;
                let Some(last) = links.pop() else {
                    return Err(ContractError::malformed("cannot chain an empty list of contracts"));
                };
                let mut acc = last.contract;
                while let Some(link) = links.pop() {
                    acc = self.sequence(&link.contract, &acc, vars, link.last_step)?;
                }
                Ok(acc)
            }
        }
    }
}
