//! Operational requirement populations.
//!
//! A [`RequirementSample`] is turned into an ordered list of named
//! requirement contracts for a given timeline:
//!
//! 1. `durations`: every task duration at least the minimum;
//! 2. `initial`: the initial state of every tracked quantity;
//! 3. one minimum state-of-charge group per five-step block
//!    (`output_soc` for a five-step timeline, `output_soc1-5` …
//!    `output_soc16-20` for a twenty-step one).

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lhs::{scale, LatinHypercube};
use super::scenario::{Timeline, BLOCK_STEPS};
use crate::algebra::{ContractAlgebra, NamedContract};
use crate::error::ContractError;
use crate::factory::{ContractFactory, StateVar};

/// Number of sampled requirement parameters.
pub const REQUIREMENT_DIMENSIONS: usize = 5;

/// Default requirement bounds, in [`RequirementSample`] field order.
pub const DEFAULT_REQUIREMENT_LOWER: [f64; REQUIREMENT_DIMENSIONS] =
    [90.0, 5.0, 5.0, 60.0, 40.0];
pub const DEFAULT_REQUIREMENT_UPPER: [f64; REQUIREMENT_DIMENSIONS] =
    [100.0, 30.0, 100.0, 100.0, 90.0];

/// Relative trajectory distance at the start of every timeline.
pub const INITIAL_DISTANCE: f64 = 100.0;

/// One sampled set of operational requirements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequirementSample {
    /// Minimum state of charge at the start.
    pub initial_soc: f64,
    /// Minimum state of charge at the exit of every step.
    pub min_exit_soc: f64,
    /// Minimum duration of every task.
    pub min_duration: f64,
    /// Stored data volume at the start.
    pub initial_data: f64,
    /// Navigation uncertainty at the start.
    pub initial_uncertainty: f64,
}

impl RequirementSample {
    pub fn from_slice(values: &[f64]) -> Result<Self, ContractError> {
        match values {
            &[initial_soc, min_exit_soc, min_duration, initial_data, initial_uncertainty] => {
                Ok(Self {
                    initial_soc,
                    min_exit_soc,
                    min_duration,
                    initial_data,
                    initial_uncertainty,
                })
            }
            _ => Err(ContractError::malformed(format!(
                "expected {REQUIREMENT_DIMENSIONS} requirement values, got {}",
                values.len()
            ))),
        }
    }

    /// Named requirement contracts for `timeline`, in merge order.
    pub fn contracts<A: ContractAlgebra>(
        &self,
        factory: &mut ContractFactory<'_, A>,
        timeline: Timeline,
    ) -> Result<Vec<NamedContract>, ContractError> {
        let mut named = Vec::new();

        let durations = timeline.duration_variables();
        let rows: Vec<String> = durations
            .iter()
            .map(|d| format!("{d} >= {}", self.min_duration))
            .collect();
        named.push(NamedContract::new(
            "durations",
            factory.build(durations, Vec::new(), &rows, &[])?,
        ));

        let inputs: Vec<String> = StateVar::ALL.iter().map(|v| v.entry(1)).collect();
        let rows = vec![
            format!("{} >= {}", StateVar::Soc.entry(1), self.initial_soc),
            format!("{} = 0", StateVar::Cumulative.entry(1)),
            format!("{} = {}", StateVar::Data.entry(1), self.initial_data),
            format!("{} = {}", StateVar::Uncertainty.entry(1), self.initial_uncertainty),
            format!("{} = {INITIAL_DISTANCE}", StateVar::Distance.entry(1)),
        ];
        named.push(NamedContract::new(
            "initial",
            factory.build(inputs, Vec::new(), &rows, &[])?,
        ));

        let starts = timeline.block_starts();
        for &start in &starts {
            let end = start + BLOCK_STEPS - 1;
            let name = if starts.len() == 1 {
                "output_soc".to_string()
            } else {
                format!("output_soc{start}-{end}")
            };
            let outputs: Vec<String> = (start..=end).map(|s| StateVar::Soc.output(s)).collect();
            let rows: Vec<String> = outputs
                .iter()
                .map(|o| format!("{o} >= {}", self.min_exit_soc))
                .collect();
            named.push(NamedContract::new(
                name,
                factory.build(Vec::new(), outputs, &[], &rows)?,
            ));
        }
        Ok(named)
    }
}

/// Stratified sampler of requirement populations.
#[derive(Debug, Clone)]
pub struct RequirementSampler {
    lower: Vec<f64>,
    upper: Vec<f64>,
    seed: u64,
}

impl Default for RequirementSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl RequirementSampler {
    pub fn new() -> Self {
        Self {
            lower: DEFAULT_REQUIREMENT_LOWER.to_vec(),
            upper: DEFAULT_REQUIREMENT_UPPER.to_vec(),
            seed: 0,
        }
    }

    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Draws `m` requirement samples.
    pub fn sample(&self, m: usize) -> Result<Vec<RequirementSample>, ContractError> {
        if self.lower.len() != REQUIREMENT_DIMENSIONS
            || self.upper.len() != REQUIREMENT_DIMENSIONS
        {
            return Err(ContractError::malformed(format!(
                "requirement bounds must have {REQUIREMENT_DIMENSIONS} dimensions"
            )));
        }
        let points = scale(
            &LatinHypercube::new(REQUIREMENT_DIMENSIONS, self.seed).sample(m),
            &self.lower,
            &self.upper,
        );
        debug!(m, "requirements sampled");
        points.iter().map(|p| RequirementSample::from_slice(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Polyhedra;

    fn sample() -> RequirementSample {
        RequirementSample::from_slice(&[95.0, 10.0, 5.0, 80.0, 50.0]).unwrap()
    }

    #[test]
    fn test_five_step_requirements() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let named = sample().contracts(&mut factory, Timeline::FiveStep).unwrap();
        let names: Vec<&str> = named.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["durations", "initial", "output_soc"]);

        let durations = &named[0].contract;
        assert_eq!(durations.inputs().len(), 5);
        assert!(durations.has_input("duration_charging2"));

        let initial = &named[1].contract;
        assert_eq!(initial.assumptions().len(), 5);
        let b = algebra.variable_bounds(initial, "d1_entry").unwrap();
        assert!((b.lower.unwrap() - 80.0).abs() < 1e-9);
        assert!((b.upper.unwrap() - 80.0).abs() < 1e-9);

        let soc = &named[2].contract;
        assert!((1..=5).all(|s| soc.has_output(&format!("output_soc{s}"))));
        assert!(soc.assumptions().is_empty());
        assert_eq!(factory.counts().contracts, 3);
    }

    #[test]
    fn test_twenty_step_groups_do_not_overlap() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let named = sample().contracts(&mut factory, Timeline::TwentyStep).unwrap();
        let names: Vec<&str> = named.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "durations",
                "initial",
                "output_soc1-5",
                "output_soc6-10",
                "output_soc11-15",
                "output_soc16-20"
            ]
        );
        let total: usize = named[2..].iter().map(|n| n.contract.outputs().len()).sum();
        assert_eq!(total, 20);
        assert_eq!(named[0].contract.inputs().len(), 20);
    }

    #[test]
    fn test_sampler_bounds() {
        let samples = RequirementSampler::new().with_seed(5).sample(30).unwrap();
        assert_eq!(samples.len(), 30);
        for s in &samples {
            assert!((90.0..=100.0).contains(&s.initial_soc));
            assert!((5.0..=30.0).contains(&s.min_exit_soc));
            assert!((5.0..=100.0).contains(&s.min_duration));
            assert!((60.0..=100.0).contains(&s.initial_data));
            assert!((40.0..=90.0).contains(&s.initial_uncertainty));
        }
    }

    #[test]
    fn test_from_slice_length() {
        assert!(RequirementSample::from_slice(&[1.0, 2.0]).is_err());
    }
}
