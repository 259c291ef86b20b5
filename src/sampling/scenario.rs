//! Scenario populations: sampled rate ranges and the timeline contracts
//! built from them.
//!
//! # Rate dimensions
//!
//! | # | domain | rate |
//! |---|--------|------|
//! | 0 | power | dsn consumption |
//! | 1 | power | charging generation |
//! | 2 | power | sbo consumption |
//! | 3 | power | tcm_h consumption |
//! | 4 | power | tcm_dv consumption |
//! | 5 | science | dsn downlink speed |
//! | 6 | science | sbo generation |
//! | 7 | navigation | dsn noise |
//! | 8 | navigation | charging noise |
//! | 9 | navigation | sbo improvement |
//! | 10 | navigation | tcm_dv noise |
//! | 11 | navigation | tcm_dv progress |

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::lhs::{scale, LatinHypercube};
use crate::algebra::{Contract, ContractAlgebra};
use crate::counts::OperationCounts;
use crate::error::ContractError;
use crate::factory::{ContractFactory, RateRange, StateVar, Task};
use crate::sequence::{ChainLink, FoldDirection};

/// Number of sampled rate dimensions.
pub const RATE_DIMENSIONS: usize = 12;

/// Lower bounds of the mean rates.
pub const DEFAULT_RATE_LOWER: [f64; RATE_DIMENSIONS] =
    [2.0, 2.5, 0.3, 0.2, 0.1, 5.0, 2.0, 1.0, 1.0, 0.5, 1.2, 0.3];
/// Upper bounds of the mean rates.
pub const DEFAULT_RATE_UPPER: [f64; RATE_DIMENSIONS] =
    [2.2, 3.5, 0.4, 0.3, 0.2, 6.0, 8.0, 1.2, 1.2, 0.8, 1.4, 0.5];

/// Steps of one block.
pub const BLOCK_STEPS: usize = 5;

/// Canonical timeline templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    /// One block: dsn, charging, sbo, tcm_h, tcm_dv at steps 1 to 5.
    #[default]
    FiveStep,
    /// Four blocks starting at steps 1, 6, 11 and 16.
    TwentyStep,
}

impl Timeline {
    pub fn steps(self) -> usize {
        match self {
            Timeline::FiveStep => BLOCK_STEPS,
            Timeline::TwentyStep => 4 * BLOCK_STEPS,
        }
    }

    /// First step of every block.
    pub fn block_starts(self) -> Vec<usize> {
        (1..=self.steps()).step_by(BLOCK_STEPS).collect()
    }

    /// Task performed at step `s` (1-based).
    pub fn task_at(s: usize) -> Task {
        Task::CYCLE[(s + BLOCK_STEPS - 1) % BLOCK_STEPS]
    }

    /// Duration variable of every step, in step order.
    pub fn duration_variables(self) -> Vec<String> {
        (1..=self.steps()).map(|s| Self::task_at(s).duration(s)).collect()
    }
}

/// The twelve rate ranges of one scenario, by name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineRates {
    pub dsn_consumption: RateRange,
    pub charge_generation: RateRange,
    pub sbo_consumption: RateRange,
    pub tcm_h_consumption: RateRange,
    pub tcm_dv_consumption: RateRange,
    pub dsn_downlink: RateRange,
    pub sbo_generation: RateRange,
    pub dsn_noise: RateRange,
    pub charging_noise: RateRange,
    pub sbo_improvement: RateRange,
    pub tcm_dv_noise: RateRange,
    pub tcm_dv_progress: RateRange,
}

impl TimelineRates {
    /// Reads the ranges in rate-dimension order.
    pub fn from_slice(ranges: &[RateRange]) -> Result<Self, ContractError> {
        let r: &[RateRange; RATE_DIMENSIONS] = ranges.try_into().map_err(|_| {
            ContractError::malformed(format!(
                "expected {RATE_DIMENSIONS} rate ranges, got {}",
                ranges.len()
            ))
        })?;
        Ok(Self {
            dsn_consumption: r[0],
            charge_generation: r[1],
            sbo_consumption: r[2],
            tcm_h_consumption: r[3],
            tcm_dv_consumption: r[4],
            dsn_downlink: r[5],
            sbo_generation: r[6],
            dsn_noise: r[7],
            charging_noise: r[8],
            sbo_improvement: r[9],
            tcm_dv_noise: r[10],
            tcm_dv_progress: r[11],
        })
    }

    /// Ranges in rate-dimension order.
    pub fn to_vec(&self) -> Vec<RateRange> {
        vec![
            self.dsn_consumption,
            self.charge_generation,
            self.sbo_consumption,
            self.tcm_h_consumption,
            self.tcm_dv_consumption,
            self.dsn_downlink,
            self.sbo_generation,
            self.dsn_noise,
            self.charging_noise,
            self.sbo_improvement,
            self.tcm_dv_noise,
            self.tcm_dv_progress,
        ]
    }
}

/// One sampled timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Rate ranges in rate-dimension order.
    pub ranges: Vec<RateRange>,
    /// Full-timeline contract.
    pub contract: Contract,
    /// Operations spent building `contract`.
    pub counts: OperationCounts,
}

impl<'a, A: ContractAlgebra> ContractFactory<'a, A> {
    /// Five-step block starting at step `s`: each domain chained on its own
    /// states, then the three domains merged.
    ///
    /// With `rename_outputs`, the exits of the last step are renamed to
    /// `output_{v}{s+4}`.
    pub fn five_step_block(
        &mut self,
        s: usize,
        rates: &TimelineRates,
        fold: FoldDirection,
        rename_outputs: bool,
    ) -> Result<Contract, ContractError> {
        let power = vec![
            self.power_consumer(s, Task::Dsn, rates.dsn_consumption)?,
            self.charge(s + 1, rates.charge_generation)?,
            self.power_consumer(s + 2, Task::Sbo, rates.sbo_consumption)?,
            self.power_consumer(s + 3, Task::TcmH, rates.tcm_h_consumption)?,
            self.power_consumer(s + 4, Task::TcmDv, rates.tcm_dv_consumption)?,
        ];

        let science = vec![
            self.pair(
                |f| f.downlink(s, rates.dsn_downlink),
                |f| f.no_change(s, StateVar::Cumulative),
            )?,
            self.pair(
                |f| f.no_change(s + 1, StateVar::Data),
                |f| f.no_change(s + 1, StateVar::Cumulative),
            )?,
            self.pair(
                |f| f.science_storage(s + 2, rates.sbo_generation),
                |f| f.science_cumulative(s + 2, rates.sbo_generation),
            )?,
            self.pair(
                |f| f.no_change(s + 3, StateVar::Data),
                |f| f.no_change(s + 3, StateVar::Cumulative),
            )?,
            self.pair(
                |f| f.no_change(s + 4, StateVar::Data),
                |f| f.no_change(s + 4, StateVar::Cumulative),
            )?,
        ];

        let navigation = vec![
            self.uncertainty_growth(s, rates.dsn_noise)?,
            self.uncertainty_growth(s + 1, rates.charging_noise)?,
            self.pair(
                |f| f.uncertainty_improvement(s + 2, rates.sbo_improvement),
                |f| f.no_change(s + 2, StateVar::Distance),
            )?,
            self.pair(
                |f| f.no_change(s + 3, StateVar::Uncertainty),
                |f| f.no_change(s + 3, StateVar::Distance),
            )?,
            self.pair(
                |f| f.maneuver_uncertainty(s + 4, rates.tcm_dv_noise),
                |f| f.maneuver_progress(s + 4, rates.tcm_dv_progress),
            )?,
        ];

        let power = self.chain(links(s, power), &StateVar::POWER, fold)?;
        let science = self.chain(links(s, science), &StateVar::SCIENCE, fold)?;
        let navigation = self.chain(links(s, navigation), &StateVar::NAVIGATION, fold)?;
        let block = self.merge_all([&power, &science, &navigation])?;

        if !rename_outputs {
            return Ok(block);
        }
        let last = s + BLOCK_STEPS - 1;
        let pairs: Vec<(String, String)> = StateVar::ALL
            .iter()
            .map(|v| (v.exit(last), v.output(last)))
            .collect();
        self.algebra().rename(&block, &pairs)
    }

    /// Full timeline contract for `template`.
    pub fn timeline(
        &mut self,
        template: Timeline,
        rates: &TimelineRates,
        fold: FoldDirection,
    ) -> Result<Contract, ContractError> {
        match template {
            Timeline::FiveStep => self.five_step_block(1, rates, fold, true),
            Timeline::TwentyStep => {
                let starts = template.block_starts();
                let last_block = starts.len() - 1;
                let mut blocks = Vec::with_capacity(starts.len());
                for (k, &start) in starts.iter().enumerate() {
                    let block = self.five_step_block(start, rates, fold, k == last_block)?;
                    blocks.push(ChainLink::new(start + BLOCK_STEPS - 1, block));
                }
                self.chain(blocks, &StateVar::ALL, fold)
            }
        }
    }

    fn pair<F, G>(&mut self, first: F, second: G) -> Result<Contract, ContractError>
    where
        F: FnOnce(&mut Self) -> Result<Contract, ContractError>,
        G: FnOnce(&mut Self) -> Result<Contract, ContractError>,
    {
        let a = first(self)?;
        let b = second(self)?;
        self.merge(&a, &b)
    }
}

fn links(start: usize, steps: Vec<Contract>) -> Vec<ChainLink> {
    steps
        .into_iter()
        .enumerate()
        .map(|(k, c)| ChainLink::new(start + k, c))
        .collect()
}

/// Stratified sampler of scenario populations.
///
/// # Example
/// ```no_run
/// use mission_contracts::algebra::Polyhedra;
/// use mission_contracts::sampling::{ScenarioSampler, Timeline};
///
/// let algebra = Polyhedra::new();
/// let scenarios = ScenarioSampler::new(Timeline::FiveStep)
///     .with_seed(7)
///     .sample(&algebra, 16)
///     .unwrap();
/// assert_eq!(scenarios.len(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioSampler {
    timeline: Timeline,
    lower: Vec<f64>,
    upper: Vec<f64>,
    fold: FoldDirection,
    seed: u64,
}

impl ScenarioSampler {
    /// A sampler with the default rate bounds.
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            lower: DEFAULT_RATE_LOWER.to_vec(),
            upper: DEFAULT_RATE_UPPER.to_vec(),
            fold: FoldDirection::default(),
            seed: 0,
        }
    }

    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower = lower;
        self.upper = upper;
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

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    /// Draws `n` rate-range tuples: a mean hypercube scaled to the bounds
    /// and an independent deviation hypercube.
    pub fn draw(&self, n: usize) -> Result<Vec<Vec<RateRange>>, ContractError> {
        if self.lower.len() != RATE_DIMENSIONS || self.upper.len() != RATE_DIMENSIONS {
            return Err(ContractError::malformed(format!(
                "rate bounds must have {RATE_DIMENSIONS} dimensions"
            )));
        }
        let means = scale(
            &LatinHypercube::new(RATE_DIMENSIONS, self.seed).sample(n),
            &self.lower,
            &self.upper,
        );
        let deviations = LatinHypercube::new(RATE_DIMENSIONS, self.seed.wrapping_add(1)).sample(n);
        means
            .iter()
            .zip(&deviations)
            .map(|(mean, dev)| {
                mean.iter()
                    .zip(dev)
                    .map(|(&m, &d)| RateRange::from_mean_deviation(m, d))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    /// Builds one scenario from its ranges.
    pub fn build<A: ContractAlgebra>(
        &self,
        algebra: &A,
        ranges: Vec<RateRange>,
    ) -> Result<Scenario, ContractError> {
        let rates = TimelineRates::from_slice(&ranges)?;
        let mut factory = ContractFactory::new(algebra);
        let contract = factory.timeline(self.timeline, &rates, self.fold)?;
        Ok(Scenario {
            ranges,
            contract,
            counts: factory.counts(),
        })
    }

    /// Draws and builds a population of `n` scenarios. Sampling is
    /// sequential; contracts are built in parallel and returned in sample
    /// order. The first construction error aborts the population.
    pub fn sample<A: ContractAlgebra>(
        &self,
        algebra: &A,
        n: usize,
    ) -> Result<Vec<Scenario>, ContractError> {
        let draws = self.draw(n)?;
        info!(n, timeline = ?self.timeline, fold = ?self.fold, "building scenarios");
        let scenarios: Vec<Scenario> = draws
            .into_par_iter()
            .map(|ranges| self.build(algebra, ranges))
            .collect::<Result<_, _>>()?;
        let counts: OperationCounts = scenarios.iter().map(|s| s.counts).sum();
        debug!(%counts, "scenarios built");
        Ok(scenarios)
    }
}
