//! Stratified sampling of scenario and requirement populations.
//!
//! # Submodules
//!
//! - [`lhs`]: Latin hypercube sampler shared by both populations
//! - [`scenario`]: rate ranges and full-timeline contracts
//! - [`requirement`]: operational requirements and their contracts

pub mod lhs;
pub mod requirement;
pub mod scenario;

pub use lhs::LatinHypercube;
pub use requirement::{RequirementSample, RequirementSampler};
pub use scenario::{Scenario, ScenarioSampler, Timeline, TimelineRates};
