//! End-to-end analysis driver.
//!
//! config → scenario population → requirement population → parallel
//! cross-product evaluation → aggregation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::aggregate::{aggregate, Aggregate};
use crate::algebra::ContractAlgebra;
use crate::config::AnalysisConfig;
use crate::counts::OperationCounts;
use crate::error::AnalysisError;
use crate::sampling::{RequirementSample, Scenario};
use crate::schedulability::{evaluate_all, UnitFailure};

/// Everything an analysis run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub scenarios: Vec<Scenario>,
    pub requirements: Vec<RequirementSample>,
    pub aggregate: Aggregate,
    /// Pairs that could not be evaluated.
    pub failures: Vec<UnitFailure>,
    /// Operations spent building the scenario population.
    pub build_counts: OperationCounts,
    /// Operations spent evaluating pairs.
    pub evaluation_counts: OperationCounts,
}

impl AnalysisReport {
    pub fn failures_by_requirement(&self) -> BTreeMap<String, usize> {
        self.aggregate.failures_by_requirement()
    }
}

/// Runs a full analysis.
///
/// Scenario construction errors abort the run. Evaluation faults of single
/// pairs are collected in [`AnalysisReport::failures`].
pub fn run<A: ContractAlgebra>(
    algebra: &A,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;

    let started = Instant::now();
    let scenarios = config
        .scenario_sampler()
        .sample(algebra, config.scenarios)?;
    let build_counts: OperationCounts = scenarios.iter().map(|s| s.counts).sum();
    info!(
        scenarios = scenarios.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        counts = %build_counts,
        "scenario population built"
    );

    let requirements = config.requirement_sampler().sample(config.requirements)?;

    let started = Instant::now();
    let batch = evaluate_all(algebra, config.timeline, &scenarios, &requirements);
    let failures = batch.failures.clone();
    let evaluation_counts = batch.counts;
    let aggregate = aggregate(batch.into_outcomes());
    info!(
        admissible = aggregate.admissible.len(),
        inadmissible = aggregate.inadmissible.len(),
        failures = failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis complete"
    );

    Ok(AnalysisReport {
        config: config.clone(),
        scenarios,
        requirements,
        aggregate,
        failures,
        build_counts,
        evaluation_counts,
    })
}
