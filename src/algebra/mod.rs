//! Constraint algebra: contracts over linear constraints.
//!
//! The pipeline only talks to the [`ContractAlgebra`] trait, so the linear
//! constraint solver behind it can be replaced without touching templates,
//! samplers or the evaluator.
//!
//! # Operations
//!
//! | operation | failure |
//! |-----------|---------|
//! | `construct` | `MalformedConstraint` |
//! | `rename` | `MalformedConstraint` |
//! | `compose` | `IncompatibleContract` |
//! | `merge` | `UnsatisfiableMerge` |
//! | `simplify` | none |
//! | `variable_bounds` | `UnboundedOrInfeasible` |
//!
//! # Submodules
//!
//! - [`linear`]: constraint representation
//! - [`parse`]: textual constraint notation
//! - [`polyhedra`]: reference backend
//!
//! # Reference
//! - Benveniste et al. (2018), "Contracts for System Design"
//! - Incer et al. (2022), "Pacti: Scaling Assume-Guarantee Reasoning for
//!   System Analysis and Design"

mod contract;
pub mod linear;
pub mod parse;
pub mod polyhedra;
mod simplex;

pub use contract::{Contract, NamedContract};
pub use linear::{Constraint, LinearExpr, Relation};
pub use parse::{parse_constraint, parse_constraints};
pub use polyhedra::Polyhedra;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ContractError;

/// Lower and upper bound of a variable over a contract's feasible region.
///
/// `None` marks an unbounded side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// True when both sides are finite.
    pub fn is_bounded(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }
}

/// Interface to the constraint-algebra engine.
///
/// `construct` and `rename` are purely structural and have default
/// implementations; the solver-backed operations are left to the backend.
pub trait ContractAlgebra: Send + Sync {
    /// Builds a validated contract.
    ///
    /// Fails with `MalformedConstraint` when a variable is declared both as
    /// input and output, an assumption mentions a non-input, a guarantee
    /// mentions an undeclared variable, or a coefficient is not finite.
    fn construct(
        &self,
        inputs: Vec<String>,
        outputs: Vec<String>,
        assumptions: Vec<Constraint>,
        guarantees: Vec<Constraint>,
    ) -> Result<Contract, ContractError> {
        let inputs: BTreeSet<String> = inputs.into_iter().collect();
        let outputs: BTreeSet<String> = outputs.into_iter().collect();
        validate(&inputs, &outputs, &assumptions, &guarantees)?;
        Ok(Contract::from_parts(inputs, outputs, assumptions, guarantees))
    }

    /// Parses the textual constraints, then calls [`construct`](Self::construct).
    fn construct_from_strings<S: AsRef<str>>(
        &self,
        inputs: Vec<String>,
        outputs: Vec<String>,
        assumptions: &[S],
        guarantees: &[S],
    ) -> Result<Contract, ContractError>
    where
        Self: Sized,
    {
        self.construct(
            inputs,
            outputs,
            parse_constraints(assumptions)?,
            parse_constraints(guarantees)?,
        )
    }

    /// Renames variables. Every source must exist and no target may collide
    /// with a variable that is not itself renamed away.
    fn rename(
        &self,
        contract: &Contract,
        pairs: &[(String, String)],
    ) -> Result<Contract, ContractError> {
        if pairs.is_empty() {
            return Ok(contract.clone());
        }
        let mut map: BTreeMap<&str, &str> = BTreeMap::new();
        for (from, to) in pairs {
            if !contract.has_variable(from) {
                return Err(ContractError::malformed(format!(
                    "cannot rename unknown variable '{from}'"
                )));
            }
            if map.insert(from.as_str(), to.as_str()).is_some() {
                return Err(ContractError::malformed(format!(
                    "variable '{from}' renamed twice"
                )));
            }
        }

        let rename_set = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter()
                .map(|v| map.get(v.as_str()).map_or_else(|| v.clone(), |t| t.to_string()))
                .collect()
        };
        let inputs = rename_set(contract.inputs());
        let outputs = rename_set(contract.outputs());
        let before = contract.inputs().len() + contract.outputs().len();
        if inputs.len() + outputs.len() != before || !inputs.is_disjoint(&outputs) {
            return Err(ContractError::malformed(
                "renaming makes two variables collide".to_string(),
            ));
        }

        let assumptions = contract.assumptions().iter().map(|c| c.renamed(&map)).collect();
        let guarantees = contract.guarantees().iter().map(|c| c.renamed(&map)).collect();
        Ok(Contract::from_parts(inputs, outputs, assumptions, guarantees))
    }

    /// Composes `first` with `second`, binding outputs of one to inputs of
    /// the other. Bound variables listed in `keep` stay visible as outputs.
    fn compose(
        &self,
        first: &Contract,
        second: &Contract,
        keep: &[String],
    ) -> Result<Contract, ContractError>;

    /// Conjoins two contracts over the union of their variables.
    fn merge(&self, first: &Contract, second: &Contract) -> Result<Contract, ContractError>;

    /// Removes redundant constraints without changing the feasible region.
    fn simplify(&self, contract: &Contract) -> Result<Contract, ContractError>;

    /// Bounds of `name` over the contract's assumptions and guarantees.
    fn variable_bounds(&self, contract: &Contract, name: &str) -> Result<Bounds, ContractError>;
}

/// Checks the structural contract invariants.
pub(crate) fn validate(
    inputs: &BTreeSet<String>,
    outputs: &BTreeSet<String>,
    assumptions: &[Constraint],
    guarantees: &[Constraint],
) -> Result<(), ContractError> {
    if let Some(shared) = inputs.intersection(outputs).next() {
        return Err(ContractError::malformed(format!(
            "variable '{shared}' is both an input and an output"
        )));
    }
    for a in assumptions {
        if !a.is_finite() {
            return Err(ContractError::malformed(format!("non-finite assumption '{a}'")));
        }
        if let Some(v) = a.variables().find(|v| !inputs.contains(*v)) {
            return Err(ContractError::malformed(format!(
                "assumption '{a}' references '{v}', which is not an input"
            )));
        }
    }
    for g in guarantees {
        if !g.is_finite() {
            return Err(ContractError::malformed(format!("non-finite guarantee '{g}'")));
        }
        if let Some(v) = g
            .variables()
            .find(|v| !inputs.contains(*v) && !outputs.contains(*v))
        {
            return Err(ContractError::malformed(format!(
                "guarantee '{g}' references undeclared variable '{v}'"
            )));
        }
    }
    Ok(())
}
