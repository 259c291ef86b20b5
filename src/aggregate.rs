//! Partitioning and ranking of schedulability outcomes.
//!
//! Admissible schedules keep their encounter order. Failed merges are
//! ranked by how many requirements merged before the failure, most first;
//! the sort is stable so equal counts keep their encounter order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schedulability::{FailedMerge, SchedulabilityOutcome, Schedule};

/// Outcomes split by admissibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub admissible: Vec<Schedule>,
    /// Sorted by descending `merged.len()`.
    pub inadmissible: Vec<FailedMerge>,
}

impl Aggregate {
    /// Number of failures stopped by each requirement name.
    pub fn failures_by_requirement(&self) -> BTreeMap<String, usize> {
        let mut histogram = BTreeMap::new();
        for f in &self.inadmissible {
            *histogram.entry(f.failed_name.clone()).or_insert(0) += 1;
        }
        histogram
    }

    pub fn total(&self) -> usize {
        self.admissible.len() + self.inadmissible.len()
    }

    /// Share of admissible outcomes, 0 for an empty aggregate.
    pub fn admissible_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.admissible.len() as f64 / n as f64,
        }
    }
}

/// Partitions `outcomes` and ranks the failures.
pub fn aggregate<I>(outcomes: I) -> Aggregate
where
    I: IntoIterator<Item = SchedulabilityOutcome>,
{
    let mut result = Aggregate::default();
    for outcome in outcomes {
        match outcome {
            SchedulabilityOutcome::Admissible(s) => result.admissible.push(s),
            SchedulabilityOutcome::Inadmissible(f) => result.inadmissible.push(f),
        }
    }
    result
        .inadmissible
        .sort_by(|a, b| b.merged.len().cmp(&a.merged.len()));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Contract, ContractAlgebra, Polyhedra};
    use crate::sampling::RequirementSample;
    use proptest::prelude::*;

    /// A tiny contract whose only input carries `id`, so order can be traced.
    fn tag(id: usize) -> Contract {
        Polyhedra::new()
            .construct(vec![format!("id{id}")], vec![], vec![], vec![])
            .unwrap()
    }

    fn failed(id: usize, merged: usize) -> SchedulabilityOutcome {
        SchedulabilityOutcome::Inadmissible(FailedMerge {
            current: tag(id),
            merged: (0..merged).map(|k| format!("req{k}")).collect(),
            failed_name: format!("req{merged}"),
            failed_contract: Contract::top(),
        })
    }

    fn admissible(id: usize) -> SchedulabilityOutcome {
        SchedulabilityOutcome::Admissible(Schedule {
            scenario: Vec::new(),
            requirement: RequirementSample {
                initial_soc: id as f64,
                min_exit_soc: 0.0,
                min_duration: 0.0,
                initial_data: 0.0,
                initial_uncertainty: 0.0,
            },
            contract: Contract::top(),
        })
    }

    #[test]
    fn test_ranking_descending() {
        let outcomes = vec![failed(0, 1), failed(1, 3), failed(2, 2)];
        let agg = aggregate(outcomes);
        let counts: Vec<usize> = agg.inadmissible.iter().map(|f| f.merged.len()).collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_partition_and_histogram() {
        let outcomes = vec![admissible(0), failed(1, 0), admissible(2), failed(3, 0), failed(4, 2)];
        let agg = aggregate(outcomes);
        assert_eq!(agg.total(), 5);
        assert_eq!(agg.admissible.len(), 2);
        assert_eq!(agg.admissible[0].requirement.initial_soc, 0.0);
        assert_eq!(agg.admissible[1].requirement.initial_soc, 2.0);
        let hist = agg.failures_by_requirement();
        assert_eq!(hist.get("req0"), Some(&2));
        assert_eq!(hist.get("req2"), Some(&1));
        assert!((agg.admissible_ratio() - 0.4).abs() < 1e-12);
        assert_eq!(aggregate(Vec::new()).admissible_ratio(), 0.0);
    }

    proptest! {
        #[test]
        fn test_aggregate_is_total_stable_partition(
            spec in prop::collection::vec(prop::option::of(0usize..4), 0..40)
        ) {
            let outcomes: Vec<SchedulabilityOutcome> = spec
                .iter()
                .enumerate()
                .map(|(id, m)| match m {
                    Some(merged) => failed(id, *merged),
                    None => admissible(id),
                })
                .collect();
            let agg = aggregate(outcomes);

            prop_assert_eq!(agg.total(), spec.len());
            let expected_admissible = spec.iter().filter(|m| m.is_none()).count();
            prop_assert_eq!(agg.admissible.len(), expected_admissible);

            for pair in agg.inadmissible.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!(a.merged.len() >= b.merged.len());
                if a.merged.len() == b.merged.len() {
                    let ia = a.current.inputs().iter().next().cloned();
                    let ib = b.current.inputs().iter().next().cloned();
                    let id = |s: Option<String>| s.and_then(|s| s[2..].parse::<usize>().ok());
                    prop_assert!(id(ia) < id(ib));
                }
            }
            for pair in agg.admissible.windows(2) {
                prop_assert!(pair[0].requirement.initial_soc < pair[1].requirement.initial_soc);
            }
        }
    }
}
