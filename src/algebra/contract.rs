//! Assume/guarantee contract values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::linear::Constraint;
use super::validate;
use crate::error::ContractError;

/// An assume/guarantee contract over linear constraints.
///
/// Invariants (enforced by [`ContractAlgebra::construct`](super::ContractAlgebra::construct)):
/// - inputs and outputs are disjoint;
/// - assumptions only mention inputs;
/// - guarantees only mention inputs and outputs.
///
/// Values are immutable: renaming, composition and merging all return a
/// new contract. Deserialized contracts are validated like constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContract")]
pub struct Contract {
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
    assumptions: Vec<Constraint>,
    guarantees: Vec<Constraint>,
}

#[derive(Deserialize)]
struct RawContract {
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
    assumptions: Vec<Constraint>,
    guarantees: Vec<Constraint>,
}

impl TryFrom<RawContract> for Contract {
    type Error = ContractError;

    fn try_from(raw: RawContract) -> Result<Self, Self::Error> {
        validate(&raw.inputs, &raw.outputs, &raw.assumptions, &raw.guarantees)?;
        Ok(Self::from_parts(
            raw.inputs,
            raw.outputs,
            raw.assumptions,
            raw.guarantees,
        ))
    }
}

impl Contract {
    /// Assembles a contract without validation. Callers are the algebra
    /// implementations, which validate or preserve the invariants.
    pub(crate) fn from_parts(
        inputs: BTreeSet<String>,
        outputs: BTreeSet<String>,
        assumptions: Vec<Constraint>,
        guarantees: Vec<Constraint>,
    ) -> Self {
        Self {
            inputs,
            outputs,
            assumptions,
            guarantees,
        }
    }

    /// The trivial contract: no variables, no constraints.
    pub fn top() -> Self {
        Self::from_parts(BTreeSet::new(), BTreeSet::new(), Vec::new(), Vec::new())
    }

    pub fn inputs(&self) -> &BTreeSet<String> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    pub fn assumptions(&self) -> &[Constraint] {
        &self.assumptions
    }

    pub fn guarantees(&self) -> &[Constraint] {
        &self.guarantees
    }

    /// True if `name` is an input variable.
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains(name)
    }

    /// True if `name` is an output variable.
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains(name)
    }

    /// True if `name` is an input or output variable.
    pub fn has_variable(&self, name: &str) -> bool {
        self.has_input(name) || self.has_output(name)
    }

    /// Assumptions followed by guarantees: the constraints that define the
    /// contract's feasible region.
    pub fn region(&self) -> Vec<Constraint> {
        self.assumptions
            .iter()
            .chain(self.guarantees.iter())
            .cloned()
            .collect()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BTreeSet<String>,
        BTreeSet<String>,
        Vec<Constraint>,
        Vec<Constraint>,
    ) {
        (self.inputs, self.outputs, self.assumptions, self.guarantees)
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        writeln!(f, "InVars: [{}]", join(&self.inputs))?;
        writeln!(f, "OutVars: [{}]", join(&self.outputs))?;
        writeln!(f, "A: [")?;
        for a in &self.assumptions {
            writeln!(f, "  {a}")?;
        }
        writeln!(f, "]")?;
        writeln!(f, "G: [")?;
        for g in &self.guarantees {
            writeln!(f, "  {g}")?;
        }
        write!(f, "]")
    }
}

/// A contract with a diagnostic name, used in ordered merge sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContract {
    pub name: String,
    pub contract: Contract,
}

impl NamedContract {
    pub fn new(name: impl Into<String>, contract: Contract) -> Self {
        Self {
            name: name.into(),
            contract,
        }
    }
}
