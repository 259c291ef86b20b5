//! Error types.
//!
//! Two layers:
//! - [`ContractError`]: failures reported by the constraint algebra and the
//!   contract templates built on top of it.
//! - [`AnalysisError`]: failures of a whole analysis run (configuration,
//!   persistence, or a fatal contract error during population building).
//!
//! # Policy
//!
//! Errors raised while building templates or scenarios are fatal for that
//! construction. `UnsatisfiableMerge` raised while evaluating a
//! (scenario, requirement) pair is expected and is turned into a
//! `FailedMerge` record by the evaluator instead of being propagated.

use serde::{Deserialize, Serialize};

/// Errors produced by contract construction and the contract algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum ContractError {
    #[error("malformed constraint: {message}")]
    MalformedConstraint { message: String },

    #[error("incompatible contracts: {message}")]
    IncompatibleContract { message: String },

    #[error("unsatisfiable merge: {message}")]
    UnsatisfiableMerge { message: String },

    #[error("variable '{variable}' is unbounded or infeasible")]
    UnboundedOrInfeasible { variable: String },

    #[error("invalid rate range [{low}, {high}]")]
    InvalidRange { low: f64, high: f64 },

    #[error("linear solver did not terminate after {iterations} pivots")]
    SolverStalled { iterations: usize },
}

impl ContractError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedConstraint {
            message: message.into(),
        }
    }

    pub(crate) fn incompatible(message: impl Into<String>) -> Self {
        Self::IncompatibleContract {
            message: message.into(),
        }
    }

    pub(crate) fn unsatisfiable(message: impl Into<String>) -> Self {
        Self::UnsatisfiableMerge {
            message: message.into(),
        }
    }

    /// True for the infeasibility outcome that schedulability evaluation
    /// treats as data.
    pub fn is_unsatisfiable_merge(&self) -> bool {
        matches!(self, Self::UnsatisfiableMerge { .. })
    }
}

/// Errors produced by an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
