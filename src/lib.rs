//! Compositional schedulability analysis of multi-domain mission timelines.
//!
//! Mission timelines (power, science/communication, navigation) are
//! described with assume/guarantee contracts over linear constraints. A
//! population of randomly parameterized timelines is crossed with a
//! population of operational requirements; each pair is either admissible
//! (every requirement merges into the timeline contract) or fails at a
//! first, named requirement.
//!
//! # Modules
//!
//! - **`algebra`**: contracts, linear constraints, the [`ContractAlgebra`]
//!   trait and the [`Polyhedra`] backend
//! - **`factory`**: per-step contract templates
//! - **`sequence`**: sequential composition and chain folding
//! - **`viewpoint`**: viewpoint merging
//! - **`sampling`**: Latin hypercube, scenario and requirement populations
//! - **`schedulability`**: ordered short-circuit merges, parallel batches
//! - **`aggregate`**: partitioning and ranking of outcomes
//! - **`analysis`**: end-to-end driver
//! - **`config`**, **`persist`**, **`report`**, **`counts`**, **`error`**
//!
//! # Example
//! ```
//! use mission_contracts::algebra::Polyhedra;
//! use mission_contracts::factory::{ContractFactory, RateRange, StateVar, Task};
//!
//! let algebra = Polyhedra::new();
//! let mut factory = ContractFactory::new(&algebra);
//! let charge = factory.charge(1, RateRange::new(2.5, 3.5).unwrap()).unwrap();
//! let dsn = factory
//!     .power_consumer(2, Task::Dsn, RateRange::new(2.0, 2.5).unwrap())
//!     .unwrap();
//! let timeline = factory.sequence(&charge, &dsn, &StateVar::POWER, 1).unwrap();
//! assert!(timeline.has_output("output_soc1"));
//! ```
//!
//! # References
//!
//! - Benveniste et al. (2018), "Contracts for System Design"
//! - Incer et al. (2022), "Pacti: Scaling Assume-Guarantee Reasoning for
//!   System Analysis and Design"

pub mod aggregate;
pub mod algebra;
pub mod analysis;
pub mod config;
pub mod counts;
pub mod error;
pub mod factory;
pub mod persist;
pub mod report;
pub mod sampling;
pub mod schedulability;
pub mod sequence;
pub mod viewpoint;

pub use algebra::{Contract, ContractAlgebra, NamedContract, Polyhedra};
pub use counts::OperationCounts;
pub use error::{AnalysisError, ContractError};
pub use factory::{ContractFactory, RateRange, StateVar, Task};
pub use schedulability::{FailedMerge, SchedulabilityOutcome, Schedule};
