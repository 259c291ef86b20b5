//! Schedulability evaluation of (scenario, requirement) pairs.
//!
//! # Algorithm
//!
//! Requirements are merged into the scenario contract one at a time, in
//! order. The first merge that turns out infeasible stops the sequence and
//! is recorded as a [`FailedMerge`]: the contract before the failure, the
//! names merged so far, and the failing requirement. Nothing after it is
//! built or merged.
//!
//! Only `UnsatisfiableMerge` is data. Any other error is a fault of the
//! unit and surfaces as a [`UnitFailure`] in batch runs.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algebra::{Contract, ContractAlgebra, NamedContract};
use crate::counts::OperationCounts;
use crate::error::ContractError;
use crate::factory::{ContractFactory, RateRange};
use crate::sampling::{RequirementSample, Scenario, Timeline};

/// A pair whose requirements all merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub scenario: Vec<RateRange>,
    pub requirement: RequirementSample,
    pub contract: Contract,
}

/// The first point of failure of a merge sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedMerge {
    /// Contract before the failing merge.
    pub current: Contract,
    /// Requirements merged before the failure, in order.
    pub merged: Vec<String>,
    pub failed_name: String,
    pub failed_contract: Contract,
}

/// Result of a merge sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeSequence {
    Complete(Contract),
    Failed(FailedMerge),
}

/// Result of one pair evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulabilityOutcome {
    Admissible(Schedule),
    Inadmissible(FailedMerge),
}

impl SchedulabilityOutcome {
    pub fn is_admissible(&self) -> bool {
        matches!(self, Self::Admissible(_))
    }
}

/// Merges `requirements` into `current` in order, stopping at the first
/// unsatisfiable merge.
pub fn perform_merges_seq<A: ContractAlgebra>(
    factory: &mut ContractFactory<'_, A>,
    current: Contract,
    requirements: &[NamedContract],
) -> Result<MergeSequence, ContractError> {
    let mut current = current;
    let mut merged = Vec::with_capacity(requirements.len());
    for req in requirements {
        match factory.merge(&current, &req.contract) {
            Ok(next) => {
                current = next;
                merged.push(req.name.clone());
            }
            Err(e) if e.is_unsatisfiable_merge() => {
                return Ok(MergeSequence::Failed(FailedMerge {
                    current,
                    merged,
                    failed_name: req.name.clone(),
                    failed_contract: req.contract.clone(),
                }));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(MergeSequence::Complete(current))
}

/// Evaluates one pair. Returns the outcome and the operations it took.
pub fn evaluate<A: ContractAlgebra>(
    algebra: &A,
    timeline: Timeline,
    scenario: &Scenario,
    requirement: &RequirementSample,
) -> Result<(SchedulabilityOutcome, OperationCounts), ContractError> {
    let mut factory = ContractFactory::new(algebra);
    let requirements = requirement.contracts(&mut factory, timeline)?;
    let sequence = perform_merges_seq(&mut factory, scenario.contract.clone(), &requirements)?;
    let outcome = match sequence {
        MergeSequence::Complete(contract) => SchedulabilityOutcome::Admissible(Schedule {
            scenario: scenario.ranges.clone(),
            requirement: *requirement,
            contract,
        }),
        MergeSequence::Failed(failed) => SchedulabilityOutcome::Inadmissible(failed),
    };
    Ok((outcome, factory.counts()))
}

/// Position of a pair in the scenario-major cross product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairId {
    pub scenario: usize,
    pub requirement: usize,
}

/// A pair that produced an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub pair: PairId,
    pub message: String,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Completed pairs, in pair order.
    pub outcomes: Vec<(PairId, SchedulabilityOutcome)>,
    /// Pairs that could not complete, in pair order.
    pub failures: Vec<UnitFailure>,
    /// Operations of the completed pairs.
    pub counts: OperationCounts,
}

impl BatchReport {
    /// Outcomes without their pair identity.
    pub fn into_outcomes(self) -> Vec<SchedulabilityOutcome> {
        self.outcomes.into_iter().map(|(_, o)| o).collect()
    }
}

/// Evaluates every (scenario, requirement) pair in parallel.
///
/// Each pair is isolated: an error or a panic in one pair is reported in
/// [`BatchReport::failures`] and does not affect the others.
pub fn evaluate_all<A: ContractAlgebra>(
    algebra: &A,
    timeline: Timeline,
    scenarios: &[Scenario],
    requirements: &[RequirementSample],
) -> BatchReport {
    let pairs: Vec<PairId> = (0..scenarios.len())
        .flat_map(|scenario| {
            (0..requirements.len()).map(move |requirement| PairId {
                scenario,
                requirement,
            })
        })
        .collect();
    info!(pairs = pairs.len(), ?timeline, "evaluating schedulability");

    let results: Vec<(PairId, Result<(SchedulabilityOutcome, OperationCounts), String>)> = pairs
        .into_par_iter()
        .map(|pair| {
            let run = catch_unwind(AssertUnwindSafe(|| {
                evaluate(
                    algebra,
                    timeline,
                    &scenarios[pair.scenario],
                    &requirements[pair.requirement],
                )
            }));
            let result = match run {
                Ok(Ok(done)) => Ok(done),
                Ok(Err(e)) => Err(e.to_string()),
                Err(panic) => Err(panic_message(panic.as_ref())),
            };
            (pair, result)
        })
        .collect();

    let mut report = BatchReport::default();
    for (pair, result) in results {
        match result {
            Ok((outcome, counts)) => {
                report.counts += counts;
                report.outcomes.push((pair, outcome));
            }
            Err(message) => {
                warn!(
                    scenario = pair.scenario,
                    requirement = pair.requirement,
                    %message,
                    "pair evaluation failed"
                );
                report.failures.push(UnitFailure { pair, message });
            }
        }
    }
    let admissible = report.outcomes.iter().filter(|(_, o)| o.is_admissible()).count();
    debug!(
        admissible,
        inadmissible = report.outcomes.len() - admissible,
        failures = report.failures.len(),
        counts = %report.counts,
        "schedulability evaluated"
    );
    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: unknown payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Bounds, Polyhedra};
    use crate::sampling::{ScenarioSampler, TimelineRates};
    use crate::sequence::FoldDirection;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn requirement(min_duration: f64) -> RequirementSample {
        RequirementSample {
            initial_soc: 95.0,
            min_exit_soc: 10.0,
            min_duration,
            initial_data: 80.0,
            initial_uncertainty: 50.0,
        }
    }

    fn scenario(algebra: &Polyhedra) -> Scenario {
        scenario_for(algebra, Timeline::FiveStep)
    }

    fn scenario_for(algebra: &Polyhedra, timeline: Timeline) -> Scenario {
        let ranges: Vec<RateRange> = crate::sampling::scenario::DEFAULT_RATE_LOWER
            .iter()
            .map(|&m| RateRange::from_mean_deviation(m, 0.1).unwrap())
            .collect();
        let rates = TimelineRates::from_slice(&ranges).unwrap();
        let mut factory = ContractFactory::new(algebra);
        let contract = factory
            .timeline(timeline, &rates, FoldDirection::RightToLeft)
            .unwrap();
        Scenario {
            ranges,
            contract,
            counts: factory.counts(),
        }
    }

    #[test]
    fn test_perform_merges_seq_short_circuits() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let base = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["0 <= x <= 10"], &["y = x"])
            .unwrap();
        let reqs = vec![
            NamedContract::new(
                "low",
                algebra
                    .construct_from_strings(names(&["x"]), vec![], &["x <= 5"], &[])
                    .unwrap(),
            ),
            NamedContract::new(
                "high",
                algebra
                    .construct_from_strings(vec![], names(&["y"]), &[], &["y >= 7"])
                    .unwrap(),
            ),
            NamedContract::new(
                "never",
                algebra
                    .construct_from_strings(names(&["x"]), vec![], &["x >= 1"], &[])
                    .unwrap(),
            ),
        ];

        let result = perform_merges_seq(&mut factory, base, &reqs).unwrap();
        let MergeSequence::Failed(failed) = result else {
            panic!("expected a failed merge");
        };
        assert_eq!(failed.merged, vec!["low"]);
        assert_eq!(failed.failed_name, "high");
        assert!(failed.merged.len() < reqs.len());
        assert_eq!(factory.counts().merges, 1);

        let again = algebra.merge(&failed.current, &failed.failed_contract);
        assert!(again.unwrap_err().is_unsatisfiable_merge());
    }

    #[test]
    fn test_perform_merges_seq_complete() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let base = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["0 <= x <= 10"], &["y = x"])
            .unwrap();
        let reqs = vec![NamedContract::new(
            "low",
            algebra
                .construct_from_strings(names(&["x"]), vec![], &["x <= 5"], &[])
                .unwrap(),
        )];
        let result = perform_merges_seq(&mut factory, base, &reqs).unwrap();
        let MergeSequence::Complete(c) = result else {
            panic!("expected every merge to succeed");
        };
        let b: Bounds = algebra.variable_bounds(&c, "y").unwrap();
        assert!((b.upper.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_perform_merges_seq_propagates_structural_errors() {
        let algebra = Polyhedra::new();
        let mut factory = ContractFactory::new(&algebra);
        let base = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["0 <= x"], &["y = x"])
            .unwrap();
        // y is an output of the base and an input of the requirement
        let reqs = vec![NamedContract::new(
            "flipped",
            algebra
                .construct_from_strings(names(&["y"]), vec![], &["y >= 0"], &[])
                .unwrap(),
        )];
        assert!(perform_merges_seq(&mut factory, base, &reqs).is_err());
    }

    #[test]
    fn test_evaluate_fails_on_durations() {
        let algebra = Polyhedra::new();
        let scenario = scenario(&algebra);
        // every consumer must run 100 time units on a 100% battery
        let (outcome, counts) =
            evaluate(&algebra, Timeline::FiveStep, &scenario, &requirement(100.0)).unwrap();
        let SchedulabilityOutcome::Inadmissible(failed) = outcome else {
            panic!("expected an inadmissible pair");
        };
        assert!(failed.merged.is_empty());
        assert_eq!(failed.failed_name, "durations");
        assert_eq!(counts.contracts, 3);
        assert_eq!(counts.merges, 0);
    }

    fn assert_reproducible(algebra: &Polyhedra, failed: &FailedMerge, total: usize) {
        assert!(failed.merged.len() < total);
        let again = algebra.merge(&failed.current, &failed.failed_contract);
        assert!(again.unwrap_err().is_unsatisfiable_merge());
    }

    #[test]
    fn test_evaluate_admissible() {
        let algebra = Polyhedra::new();
        let scenario = scenario(&algebra);
        let (outcome, counts) =
            evaluate(&algebra, Timeline::FiveStep, &scenario, &requirement(5.0)).unwrap();
        let SchedulabilityOutcome::Admissible(schedule) = outcome else {
            panic!("expected an admissible pair");
        };
        assert_eq!(schedule.scenario, scenario.ranges);
        assert!(schedule.contract.has_output("output_soc5"));
        assert_eq!(counts.merges, 3);
    }

    #[test]
    fn test_evaluate_fails_on_initial_state() {
        let algebra = Polyhedra::new();
        let scenario = scenario(&algebra);
        // a 15-unit downlink needs more stored data than the 60 on board
        let sample = RequirementSample {
            initial_data: 60.0,
            ..requirement(15.0)
        };
        let (outcome, _) = evaluate(&algebra, Timeline::FiveStep, &scenario, &sample).unwrap();
        let SchedulabilityOutcome::Inadmissible(failed) = outcome else {
            panic!("expected an inadmissible pair");
        };
        assert_eq!(failed.merged, vec!["durations"]);
        assert_eq!(failed.failed_name, "initial");
        assert_reproducible(&algebra, &failed, 3);
    }

    #[test]
    fn test_evaluate_fails_on_exit_soc() {
        let algebra = Polyhedra::new();
        let scenario = scenario(&algebra);
        // the first task alone drains below 95
        let sample = RequirementSample {
            min_exit_soc: 95.0,
            ..requirement(5.0)
        };
        let (outcome, _) = evaluate(&algebra, Timeline::FiveStep, &scenario, &sample).unwrap();
        let SchedulabilityOutcome::Inadmissible(failed) = outcome else {
            panic!("expected an inadmissible pair");
        };
        assert_eq!(failed.merged, vec!["durations", "initial"]);
        assert_eq!(failed.failed_name, "output_soc");
        assert_reproducible(&algebra, &failed, 3);
    }

    #[test]
    fn test_evaluate_twenty_step() {
        let algebra = Polyhedra::new();
        let scenario = scenario_for(&algebra, Timeline::TwentyStep);

        let (outcome, _) =
            evaluate(&algebra, Timeline::TwentyStep, &scenario, &requirement(5.0)).unwrap();
        let SchedulabilityOutcome::Admissible(schedule) = outcome else {
            panic!("expected an admissible pair");
        };
        assert!(schedule.contract.has_output("output_soc20"));

        let (outcome, counts) =
            evaluate(&algebra, Timeline::TwentyStep, &scenario, &requirement(40.0)).unwrap();
        let SchedulabilityOutcome::Inadmissible(failed) = outcome else {
            panic!("expected an inadmissible pair");
        };
        assert!(failed.merged.is_empty());
        assert_eq!(failed.failed_name, "durations");
        assert_reproducible(&algebra, &failed, 6);
        assert_eq!(counts.contracts, 6);
    }

    /// Delegates to [`Polyhedra`] but panics when merging into a contract
    /// that mentions `poison`.
    struct Poisoned(Polyhedra);

    impl ContractAlgebra for Poisoned {
        fn compose(
            &self,
            a: &Contract,
            b: &Contract,
            keep: &[String],
        ) -> Result<Contract, ContractError> {
            self.0.compose(a, b, keep)
        }

        fn merge(&self, a: &Contract, b: &Contract) -> Result<Contract, ContractError> {
            if a.has_variable("poison") {
                panic!("poisoned contract");
            }
            self.0.merge(a, b)
        }

        fn simplify(&self, c: &Contract) -> Result<Contract, ContractError> {
            self.0.simplify(c)
        }

        fn variable_bounds(&self, c: &Contract, name: &str) -> Result<Bounds, ContractError> {
            self.0.variable_bounds(c, name)
        }
    }

    #[test]
    fn test_evaluate_all_isolates_failing_unit() {
        let algebra = Poisoned(Polyhedra::new());
        let healthy = scenario(&algebra.0);
        let poisoned = Scenario {
            ranges: healthy.ranges.clone(),
            contract: algebra
                .construct_from_strings(names(&["poison"]), vec![], &["poison >= 0"], &[])
                .unwrap(),
            counts: OperationCounts::default(),
        };
        let requirements = vec![requirement(100.0), requirement(100.0)];

        let scenarios = [healthy, poisoned];
        let report = evaluate_all(&algebra, Timeline::FiveStep, &scenarios, &requirements);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|f| f.pair.scenario == 1));
        assert!(report.failures[0].message.contains("poisoned"));
        let order: Vec<PairId> = report.outcomes.iter().map(|(p, _)| *p).collect();
        assert_eq!(
            order,
            vec![
                PairId { scenario: 0, requirement: 0 },
                PairId { scenario: 0, requirement: 1 }
            ]
        );
        assert_eq!(report.counts.contracts, 6);
    }

    #[test]
    fn test_sampled_population_evaluates() {
        let algebra = Polyhedra::new();
        let scenarios = ScenarioSampler::new(Timeline::FiveStep)
            .with_seed(1)
            .sample(&algebra, 2)
            .unwrap();
        let requirements = crate::sampling::RequirementSampler::new()
            .with_seed(2)
            .sample(2)
            .unwrap();
        let report = evaluate_all(&algebra, Timeline::FiveStep, &scenarios, &requirements);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.outcomes.len(), 4);
    }

    #[test]
    fn test_sampled_failures_reproduce() {
        let algebra = Polyhedra::new();
        let scenarios = ScenarioSampler::new(Timeline::FiveStep)
            .with_seed(3)
            .sample(&algebra, 3)
            .unwrap();
        let requirements = crate::sampling::RequirementSampler::new()
            .with_seed(4)
            .sample(6)
            .unwrap();
        let report = evaluate_all(&algebra, Timeline::FiveStep, &scenarios, &requirements);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.outcomes.len(), 18);

        let order = ["durations", "initial", "output_soc"];
        for (_, outcome) in &report.outcomes {
            if let SchedulabilityOutcome::Inadmissible(failed) = outcome {
                assert_reproducible(&algebra, failed, order.len());
                assert_eq!(failed.merged, order[..failed.merged.len()]);
                assert_eq!(failed.failed_name, order[failed.merged.len()]);
            }
        }
    }
}
