//! Human-readable summaries.

use std::fmt::Write;

use crate::aggregate::Aggregate;
use crate::algebra::{Contract, ContractAlgebra};

/// One line per input, then per output variable, each group sorted by name.
///
/// Lines read ` input x in [lo,hi]` / `output y in [lo,hi]` with two
/// decimals, `None` for an unbounded side and `is unknown` when the bound
/// query fails.
pub fn bound_summary<A: ContractAlgebra>(algebra: &A, contract: &Contract) -> Vec<String> {
    let inputs = contract.inputs().iter().map(|v| (" input", v));
    let outputs = contract.outputs().iter().map(|v| ("output", v));
    inputs
        .chain(outputs)
        .map(|(role, name)| match algebra.variable_bounds(contract, name) {
            Ok(b) => format!("{role} {name} in [{},{}]", side(b.lower), side(b.upper)),
            Err(_) => format!("{role} {name} is unknown"),
        })
        .collect()
}

fn side(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "None".to_string(),
    }
}

/// Short text overview of an aggregate: totals and the failure histogram.
pub fn aggregate_summary(aggregate: &Aggregate) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} admissible, {} inadmissible ({:.1}% admissible)",
        aggregate.admissible.len(),
        aggregate.inadmissible.len(),
        100.0 * aggregate.admissible_ratio()
    );
    for (name, count) in aggregate.failures_by_requirement() {
        let _ = writeln!(out, "  failed at {name}: {count}");
    }
    out
}
