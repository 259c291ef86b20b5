//! Analysis configuration.
//!
//! [`AnalysisConfig::default`] reproduces the reference case study: 200
//! five-step scenarios, 30 requirement samples, default rate and
//! requirement bounds, right-to-left chaining.
//!
//! # Example
//! ```
//! use mission_contracts::config::AnalysisConfig;
//! use mission_contracts::sampling::Timeline;
//!
//! let config = AnalysisConfig::default()
//!     .with_timeline(Timeline::TwentyStep)
//!     .with_scenarios(50)
//!     .with_seed(7);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalysisError;
use crate::sampling::requirement::{
    DEFAULT_REQUIREMENT_LOWER, DEFAULT_REQUIREMENT_UPPER, REQUIREMENT_DIMENSIONS,
};
use crate::sampling::scenario::{DEFAULT_RATE_LOWER, DEFAULT_RATE_UPPER, RATE_DIMENSIONS};
use crate::sampling::{RequirementSampler, ScenarioSampler, Timeline};
use crate::sequence::FoldDirection;

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of scenarios.
    pub scenarios: usize,
    /// Number of requirement samples.
    pub requirements: usize,
    pub timeline: Timeline,
    pub fold: FoldDirection,
    /// Seed for both samplers.
    pub seed: u64,
    /// Lower bounds of the mean rates.
    pub rate_lower: Vec<f64>,
    /// Upper bounds of the mean rates.
    pub rate_upper: Vec<f64>,
    pub requirement_lower: Vec<f64>,
    pub requirement_upper: Vec<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scenarios: 200,
            requirements: 30,
            timeline: Timeline::FiveStep,
            fold: FoldDirection::RightToLeft,
            seed: 0,
            rate_lower: DEFAULT_RATE_LOWER.to_vec(),
            rate_upper: DEFAULT_RATE_UPPER.to_vec(),
            requirement_lower: DEFAULT_REQUIREMENT_LOWER.to_vec(),
            requirement_upper: DEFAULT_REQUIREMENT_UPPER.to_vec(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_scenarios(mut self, scenarios: usize) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn with_requirements(mut self, requirements: usize) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    pub fn with_fold(mut self, fold: FoldDirection) -> Self {
        self.fold = fold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_rate_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.rate_lower = lower;
        self.rate_upper = upper;
        self
    }

    pub fn with_requirement_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.requirement_lower = lower;
        self.requirement_upper = upper;
        self
    }

    /// Parses a JSON configuration; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Checks population sizes and bound shapes.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.scenarios == 0 || self.requirements == 0 {
            return Err(AnalysisError::Config(
                "population sizes must be positive".to_string(),
            ));
        }
        check_bounds("rate", &self.rate_lower, &self.rate_upper, RATE_DIMENSIONS)?;
        check_bounds(
            "requirement",
            &self.requirement_lower,
            &self.requirement_upper,
            REQUIREMENT_DIMENSIONS,
        )?;
        if self.rate_lower.iter().any(|&x| x < 0.0) {
            return Err(AnalysisError::Config(
                "rate bounds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn scenario_sampler(&self) -> ScenarioSampler {
        ScenarioSampler::new(self.timeline)
            .with_bounds(self.rate_lower.clone(), self.rate_upper.clone())
            .with_fold(self.fold)
            .with_seed(self.seed)
    }

    /// Requirement sampler; seeded apart from the scenario samplers.
    pub fn requirement_sampler(&self) -> RequirementSampler {
        RequirementSampler::new()
            .with_bounds(self.requirement_lower.clone(), self.requirement_upper.clone())
            .with_seed(self.seed.wrapping_add(2))
    }
}

fn check_bounds(
    kind: &str,
    lower: &[f64],
    upper: &[f64],
    dims: usize,
) -> Result<(), AnalysisError> {
    if lower.len() != dims || upper.len() != dims {
        return Err(AnalysisError::Config(format!(
            "{kind} bounds need {dims} dimensions, got {} and {}",
            lower.len(),
            upper.len()
        )));
    }
    for (k, (lo, hi)) in lower.iter().zip(upper).enumerate() {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(AnalysisError::Config(format!(
                "{kind} bound {k} is invalid: [{lo}, {hi}]"
            )));
        }
    }
    Ok(())
}
