//! Reference polyhedral backend for [`ContractAlgebra`].
//!
//! # Algorithm
//!
//! - **Feasibility, bounds, implication**: linear programs solved by the
//!   two-phase simplex in `simplex`. `K ⇒ (e ≤ b)` holds iff
//!   `sup_K e ≤ b` (or `K` is empty).
//! - **Merge**: conjunction of assumptions and of guarantees, then two
//!   feasibility checks (assumptions alone, assumptions with guarantees).
//! - **Compose** (`upstream` drives `downstream` through the bound
//!   variables):
//!   1. downstream assumptions that only mention composite inputs are kept;
//!   2. every other downstream assumption is either discharged (implied by
//!      the upstream assumptions and guarantees) or refined into a
//!      sufficient condition over composite inputs by substituting upstream
//!      bounds for the bound variables; the weakest refinement is kept;
//!   3. guarantees are conjoined and the hidden variables are projected out
//!      with Fourier–Motzkin elimination.
//!
//! # Reference
//! - Incer et al. (2022), "Pacti: Scaling Assume-Guarantee Reasoning for
//!   System Analysis and Design"
//! - Dantzig & Eaves (1973), "Fourier-Motzkin Elimination and Its Dual"

use std::collections::{BTreeMap, BTreeSet};

use super::contract::Contract;
use super::linear::{Constraint, Relation};
use super::simplex::{self, LpOutcome, FEAS_TOL};
use super::{validate, Bounds, ContractAlgebra};
use crate::error::ContractError;

/// Upper limit on refinement candidates collected per assumption.
const MAX_CANDIDATES: usize = 8;
/// Upper limit on substitution steps explored per assumption.
const MAX_EXPANSIONS: usize = 64;

fn implication_tol(rhs: f64) -> f64 {
    FEAS_TOL * (1.0 + rhs.abs())
}

/// Polyhedral contract algebra backed by a dense simplex.
///
/// # Example
/// ```
/// use mission_contracts::algebra::{ContractAlgebra, Polyhedra};
///
/// let algebra = Polyhedra::new();
/// let c = algebra
///     .construct_from_strings(
///         vec!["x".into()],
///         vec!["y".into()],
///         &["0 <= x <= 10"],
///         &["y = 2*x"],
///     )
///     .unwrap();
/// let bounds = algebra.variable_bounds(&c, "y").unwrap();
/// assert!((bounds.upper.unwrap() - 20.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct Polyhedra {
    max_candidates: usize,
    max_expansions: usize,
}

impl Default for Polyhedra {
    fn default() -> Self {
        Self::new()
    }
}

impl Polyhedra {
    /// Creates a backend with default search limits.
    pub fn new() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            max_expansions: MAX_EXPANSIONS,
        }
    }

    /// Sets how many refinement candidates are compared per assumption.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Sets how many elimination steps one refinement search may take.
    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    /// True when `rows` has at least one solution.
    pub fn is_feasible(&self, rows: &[Constraint]) -> Result<bool, ContractError> {
        simplex::feasible(rows)
    }

    /// True when every solution of `context` satisfies `target`.
    pub fn implies(
        &self,
        context: &[Constraint],
        target: &Constraint,
    ) -> Result<bool, ContractError> {
        if target.is_constant() {
            return Ok(target.holds_trivially(FEAS_TOL) || !simplex::feasible(context)?);
        }
        for ineq in target.as_inequalities() {
            let objective: BTreeMap<String, f64> =
                ineq.coeffs().iter().map(|(n, c)| (n.clone(), -c)).collect();
            match simplex::minimize(context, &objective)? {
                LpOutcome::Infeasible => return Ok(true),
                LpOutcome::Unbounded => return Ok(false),
                LpOutcome::Optimal(v) => {
                    if -v > ineq.rhs() + implication_tol(ineq.rhs()) {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// True when two contracts have the same variables, equivalent
    /// assumptions and equivalent feasible regions.
    pub fn equivalent(&self, a: &Contract, b: &Contract) -> Result<bool, ContractError> {
        if a.inputs() != b.inputs() || a.outputs() != b.outputs() {
            return Ok(false);
        }
        Ok(self.mutually_imply(a.assumptions(), b.assumptions())?
            && self.mutually_imply(&a.region(), &b.region())?)
    }

    fn mutually_imply(&self, x: &[Constraint], y: &[Constraint]) -> Result<bool, ContractError> {
        for c in y {
            if !self.implies(x, c)? {
                return Ok(false);
            }
        }
        for c in x {
            if !self.implies(y, c)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Drops rows implied by `fixed` together with the remaining rows.
    fn remove_redundant(
        &self,
        fixed: &[Constraint],
        rows: Vec<Constraint>,
    ) -> Result<Vec<Constraint>, ContractError> {
        let mut keep = vec![true; rows.len()];
        for i in 0..rows.len() {
            let context: Vec<Constraint> = fixed
                .iter()
                .cloned()
                .chain(
                    rows.iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i && keep[*j])
                        .map(|(_, r)| r.clone()),
                )
                .collect();
            if self.implies(&context, &rows[i])? {
                keep[i] = false;
            }
        }
        Ok(rows
            .into_iter()
            .zip(keep)
            .filter_map(|(r, k)| k.then_some(r))
            .collect())
    }

    /// Refines `row` into a sufficient condition that only mentions
    /// `allowed` variables, given that `context` holds.
    ///
    /// Returns `None` when the row is already implied, either by `context`
    /// or, after refinement, by `base`.
    fn refine(
        &self,
        row: &Constraint,
        context: &[Constraint],
        allowed: &BTreeSet<String>,
        base: &[Constraint],
    ) -> Result<Option<Constraint>, ContractError> {
        if self.implies(context, row)? {
            return Ok(None);
        }

        let expanded: Vec<Constraint> = context.iter().flat_map(|c| c.as_inequalities()).collect();
        let mut found: Vec<Constraint> = Vec::new();
        let mut stack: Vec<(Constraint, Vec<usize>)> = vec![(row.clone(), Vec::new())];
        let mut expansions = 0;

        while let Some((current, used)) = stack.pop() {
            let pending = current
                .variables()
                .find(|v| !allowed.contains(*v))
                .map(str::to_string);
            let Some(var) = pending else {
                if current.is_constant() {
                    if current.holds_trivially(implication_tol(current.rhs())) {
                        return Ok(None);
                    }
                    continue;
                }
                if !found.iter().any(|f| same_row(f, &current)) {
                    found.push(current);
                }
                if found.len() >= self.max_candidates {
                    break;
                }
                continue;
            };

            expansions += 1;
            if expansions > self.max_expansions {
                break;
            }
            let alpha = current.coeff(&var);
            // Reverse so the earliest context row is explored first.
            for (idx, bound) in expanded.iter().enumerate().rev() {
                let gamma = bound.coeff(&var);
                if gamma * alpha <= 0.0 || used.contains(&idx) {
                    continue;
                }
                let next = current.minus_scaled(bound, alpha / gamma);
                let mut next_used = used.clone();
                next_used.push(idx);
                stack.push((next, next_used));
            }
        }

        if found.is_empty() {
            return Err(ContractError::incompatible(format!(
                "assumption '{row}' cannot be discharged by the upstream guarantees"
            )));
        }
        for candidate in &found {
            if self.implies(base, candidate)? {
                return Ok(None);
            }
        }
        if found.len() == 1 {
            return Ok(found.pop());
        }

        // Keep the candidate implied by the most other candidates.
        let mut best = 0;
        let mut best_score = 0;
        for i in 0..found.len() {
            let mut score = 0;
            for j in 0..found.len() {
                if i == j {
                    continue;
                }
                let mut ctx = base.to_vec();
                ctx.push(found[j].clone());
                if self.implies(&ctx, &found[i])? {
                    score += 1;
                }
            }
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        Ok(Some(found.swap_remove(best)))
    }
}

impl ContractAlgebra for Polyhedra {
    fn compose(
        &self,
        first: &Contract,
        second: &Contract,
        keep: &[String],
    ) -> Result<Contract, ContractError> {
        let forward: BTreeSet<String> =
            first.outputs().intersection(second.inputs()).cloned().collect();
        let backward: BTreeSet<String> =
            second.outputs().intersection(first.inputs()).cloned().collect();
        let (upstream, downstream, bound) = match (forward.is_empty(), backward.is_empty()) {
            (_, true) => (first, second, forward),
            (true, false) => (second, first, backward),
            (false, false) => {
                return Err(ContractError::incompatible(format!(
                    "feedback composition through {forward:?} and {backward:?}"
                )))
            }
        };
        if let Some(shared) = upstream.outputs().intersection(downstream.outputs()).next() {
            return Err(ContractError::incompatible(format!(
                "both contracts drive output '{shared}'"
            )));
        }
        if let Some(k) = keep.iter().find(|k| !bound.contains(*k)) {
            return Err(ContractError::malformed(format!(
                "cannot keep '{k}': it is not bound by the composition"
            )));
        }

        let hidden: BTreeSet<String> = bound
            .iter()
            .filter(|v| !keep.contains(*v))
            .cloned()
            .collect();
        let inputs: BTreeSet<String> = upstream
            .inputs()
            .union(downstream.inputs())
            .filter(|v| !bound.contains(*v))
            .cloned()
            .collect();
        let outputs: BTreeSet<String> = upstream
            .outputs()
            .union(downstream.outputs())
            .filter(|v| !hidden.contains(*v))
            .cloned()
            .collect();

        let context = upstream.region();
        let mut assumptions: Vec<Constraint> = upstream.assumptions().to_vec();
        let mut pending = Vec::new();
        for a in downstream.assumptions() {
            if a.variables().all(|v| inputs.contains(v)) {
                assumptions.push(a.clone());
            } else {
                pending.extend(a.as_inequalities());
            }
        }
        for row in pending {
            if let Some(refined) = self.refine(&row, &context, &inputs, &assumptions)? {
                assumptions.push(refined);
            }
        }
        let assumptions = self.remove_redundant(&[], dedupe(assumptions))?;
        if !simplex::feasible(&assumptions)? {
            return Err(ContractError::incompatible(
                "composite assumptions are unsatisfiable".to_string(),
            ));
        }

        let mut guarantees: Vec<Constraint> = upstream
            .guarantees()
            .iter()
            .chain(downstream.guarantees())
            .cloned()
            .collect();
        if !hidden.is_empty() {
            guarantees = project(guarantees, &hidden);
            guarantees = self.remove_redundant(&assumptions, guarantees)?;
        }
        let guarantees = dedupe(guarantees);

        validate(&inputs, &outputs, &assumptions, &guarantees)?;
        Ok(Contract::from_parts(inputs, outputs, assumptions, guarantees))
    }

    fn merge(&self, first: &Contract, second: &Contract) -> Result<Contract, ContractError> {
        let conflict = first
            .inputs()
            .intersection(second.outputs())
            .chain(second.inputs().intersection(first.outputs()))
            .next();
        if let Some(v) = conflict {
            return Err(ContractError::malformed(format!(
                "variable '{v}' is an input of one contract and an output of the other"
            )));
        }

        let inputs = first.inputs().union(second.inputs()).cloned().collect();
        let outputs = first.outputs().union(second.outputs()).cloned().collect();
        let assumptions = dedupe(
            first
                .assumptions()
                .iter()
                .chain(second.assumptions())
                .cloned()
                .collect(),
        );
        let guarantees = dedupe(
            first
                .guarantees()
                .iter()
                .chain(second.guarantees())
                .cloned()
                .collect(),
        );

        if !simplex::feasible(&assumptions)? {
            return Err(ContractError::unsatisfiable("merged assumptions are infeasible"));
        }
        let region: Vec<Constraint> = assumptions.iter().chain(&guarantees).cloned().collect();
        if !simplex::feasible(&region)? {
            return Err(ContractError::unsatisfiable(
                "merged guarantees are infeasible under the merged assumptions",
            ));
        }
        Ok(Contract::from_parts(inputs, outputs, assumptions, guarantees))
    }

    fn simplify(&self, contract: &Contract) -> Result<Contract, ContractError> {
        let (inputs, outputs, assumptions, guarantees) = contract.clone().into_parts();
        let assumptions = self.remove_redundant(&[], dedupe(assumptions))?;
        let guarantees = self.remove_redundant(&assumptions, dedupe(guarantees))?;
        Ok(Contract::from_parts(inputs, outputs, assumptions, guarantees))
    }

    fn variable_bounds(&self, contract: &Contract, name: &str) -> Result<Bounds, ContractError> {
        let infeasible = || ContractError::UnboundedOrInfeasible {
            variable: name.to_string(),
        };
        if !contract.has_variable(name) {
            return Err(infeasible());
        }
        let region = contract.region();
        let mut objective = BTreeMap::new();
        objective.insert(name.to_string(), 1.0);
        let lower = match simplex::minimize(&region, &objective)? {
            LpOutcome::Infeasible => return Err(infeasible()),
            LpOutcome::Unbounded => None,
            LpOutcome::Optimal(v) => Some(v + 0.0),
        };
        objective.insert(name.to_string(), -1.0);
        let upper = match simplex::minimize(&region, &objective)? {
            LpOutcome::Infeasible => return Err(infeasible()),
            LpOutcome::Unbounded => None,
            LpOutcome::Optimal(v) => Some(-v + 0.0),
        };
        Ok(Bounds::new(lower, upper))
    }
}

/// Syntactic clean-up: drops trivially true rows, exact duplicates and
/// parallel inequalities that are looser than an earlier one.
pub(crate) fn dedupe(rows: Vec<Constraint>) -> Vec<Constraint> {
    let mut kept: Vec<(Constraint, Constraint)> = Vec::with_capacity(rows.len());
    for row in rows {
        if row.is_constant() && row.holds_trivially(FEAS_TOL) {
            continue;
        }
        let normal = row.normalized();
        let existing = kept
            .iter()
            .position(|(n, _)| n.same_direction(&normal, 1e-12));
        match existing {
            Some(i) if normal.relation() == Relation::LessEq => {
                if normal.rhs() < kept[i].0.rhs() {
                    kept[i] = (normal, row);
                }
            }
            Some(i) if (normal.rhs() - kept[i].0.rhs()).abs() <= 1e-12 => {}
            _ => kept.push((normal, row)),
        }
    }
    kept.into_iter().map(|(_, row)| row).collect()
}

/// Existentially quantifies `eliminate` out of `rows` (Fourier–Motzkin,
/// with Gaussian substitution whenever an equality is available).
pub(crate) fn project(rows: Vec<Constraint>, eliminate: &BTreeSet<String>) -> Vec<Constraint> {
    let mut rows = rows;
    let mut remaining: Vec<&String> = eliminate.iter().collect();

    while !remaining.is_empty() {
        let pick = remaining
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| elimination_cost(&rows, v))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let var = remaining.swap_remove(pick);

        if let Some(pos) = rows
            .iter()
            .position(|r| r.relation() == Relation::Equal && r.mentions(var))
        {
            let pivot = rows.swap_remove(pos);
            let a = pivot.coeff(var);
            rows = rows
                .into_iter()
                .map(|r| {
                    let c = r.coeff(var);
                    if c != 0.0 {
                        r.minus_scaled(&pivot, c / a)
                    } else {
                        r
                    }
                })
                .collect();
        } else {
            let (with, without): (Vec<Constraint>, Vec<Constraint>) =
                rows.into_iter().partition(|r| r.mentions(var));
            let (pos, neg): (Vec<Constraint>, Vec<Constraint>) =
                with.into_iter().partition(|r| r.coeff(var) > 0.0);
            rows = without;
            for p in &pos {
                for n in &neg {
                    rows.push(p.minus_scaled(n, p.coeff(var) / n.coeff(var)));
                }
            }
        }
        rows = dedupe(rows);
    }
    rows
}

/// Number of rows Fourier–Motzkin elimination of `var` would add, or 0
/// when an equality allows direct substitution.
fn elimination_cost(rows: &[Constraint], var: &str) -> usize {
    if rows
        .iter()
        .any(|r| r.relation() == Relation::Equal && r.mentions(var))
    {
        return 0;
    }
    let pos = rows.iter().filter(|r| r.coeff(var) > 0.0).count();
    let neg = rows.iter().filter(|r| r.coeff(var) < 0.0).count();
    pos * neg
}

fn same_row(a: &Constraint, b: &Constraint) -> bool {
    let (na, nb) = (a.normalized(), b.normalized());
    na.same_direction(&nb, 1e-9) && (na.rhs() - nb.rhs()).abs() <= 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn discharge(algebra: &Polyhedra, s: usize, lo: f64, hi: f64) -> Contract {
        algebra
            .construct_from_strings(
                vec![format!("soc{s}_entry"), format!("duration{s}")],
                vec![format!("soc{s}_exit")],
                &[
                    format!("0 <= duration{s}"),
                    format!("0 <= soc{s}_entry <= 100"),
                    format!("soc{s}_entry >= {hi}*duration{s}"),
                ],
                &[
                    format!("{lo}*duration{s} <= soc{s}_entry - soc{s}_exit <= {hi}*duration{s}"),
                    format!("0 <= soc{s}_exit <= 100"),
                ],
            )
            .unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let v = actual.expect("bounded");
        assert!((v - expected).abs() < 1e-6, "{v} != {expected}");
    }

    #[test]
    fn test_bounds_and_unbounded_side() {
        let algebra = Polyhedra::new();
        let c = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["x >= 1"], &["y >= x"])
            .unwrap();
        let b = algebra.variable_bounds(&c, "y").unwrap();
        assert_close(b.lower, 1.0);
        assert_eq!(b.upper, None);
        assert!(!b.is_bounded());
    }

    #[test]
    fn test_bounds_unknown_or_empty() {
        let algebra = Polyhedra::new();
        let c = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["x >= 1", "x <= 0"], &[])
            .unwrap();
        assert!(matches!(
            algebra.variable_bounds(&c, "x"),
            Err(ContractError::UnboundedOrInfeasible { .. })
        ));
        assert!(algebra.variable_bounds(&c, "nope").is_err());
    }

    #[test]
    fn test_merge_conflict_is_unsatisfiable() {
        let algebra = Polyhedra::new();
        let a = algebra
            .construct_from_strings(names(&["x"]), vec![], &["x >= 5"], &[])
            .unwrap();
        let b = algebra
            .construct_from_strings(names(&["x"]), vec![], &["x <= 4"], &[])
            .unwrap();
        let err = algebra.merge(&a, &b).unwrap_err();
        assert!(err.is_unsatisfiable_merge());
    }

    #[test]
    fn test_merge_guarantee_conflict() {
        let algebra = Polyhedra::new();
        let a = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &["0 <= x <= 1"], &["y = x"])
            .unwrap();
        let b = algebra
            .construct_from_strings(vec![], names(&["y"]), &[], &["y >= 2"])
            .unwrap();
        assert!(algebra.merge(&a, &b).unwrap_err().is_unsatisfiable_merge());
    }

    #[test]
    fn test_merge_role_conflict() {
        let algebra = Polyhedra::new();
        let a = algebra
            .construct_from_strings(names(&["x"]), vec![], &["x >= 0"], &[])
            .unwrap();
        let b = algebra
            .construct_from_strings(vec![], names(&["x"]), &[], &["x >= 0"])
            .unwrap();
        assert!(matches!(
            algebra.merge(&a, &b),
            Err(ContractError::MalformedConstraint { .. })
        ));
    }

    #[test]
    fn test_compose_refines_downstream_assumption() {
        let algebra = Polyhedra::new();
        let c1 = discharge(&algebra, 1, 2.0, 2.5);
        let c2 = discharge(&algebra, 2, 1.0, 1.5);
        let c2 = algebra
            .rename(&c2, &[("soc2_entry".to_string(), "soc1_exit".to_string())])
            .unwrap();
        let c12 = algebra.compose(&c1, &c2, &[]).unwrap();

        assert!(c12.has_input("soc1_entry"));
        assert!(c12.has_input("duration2"));
        assert!(!c12.has_variable("soc1_exit"));
        assert!(c12.assumptions().iter().all(|a| !a.mentions("soc1_exit")));

        // enough energy for both tasks: 2.5*d1 + 1.5*d2 <= soc1_entry
        let required = Constraint::less_eq(
            [("duration1", 2.5), ("duration2", 1.5), ("soc1_entry", -1.0)],
            0.0,
        );
        assert!(algebra.implies(c12.assumptions(), &required).unwrap());
        // and no stronger than that: d1 = 10, d2 = 10, soc = 40 is admitted
        let point = [
            Constraint::equal([("duration1", 1.0)], 10.0),
            Constraint::equal([("duration2", 1.0)], 10.0),
            Constraint::equal([("soc1_entry", 1.0)], 40.0),
        ];
        let mut rows = c12.assumptions().to_vec();
        rows.extend(point);
        assert!(algebra.is_feasible(&rows).unwrap());
    }

    #[test]
    fn test_compose_search_limits() {
        let c1 = discharge(&Polyhedra::new(), 1, 2.0, 2.5);
        let c2 = discharge(&Polyhedra::new(), 2, 1.0, 1.5);
        let bind = [("soc2_entry".to_string(), "soc1_exit".to_string())];

        let single = Polyhedra::new().with_max_candidates(1);
        let c2 = single.rename(&c2, &bind).unwrap();
        let c12 = single.compose(&c1, &c2, &[]).unwrap();
        assert!(c12.assumptions().iter().all(|a| !a.mentions("soc1_exit")));

        // refinement needs at least one elimination step
        let blind = Polyhedra::new().with_max_expansions(0);
        assert!(matches!(
            blind.compose(&c1, &c2, &[]),
            Err(ContractError::IncompatibleContract { .. })
        ));
    }

    #[test]
    fn test_compose_keeps_bound_variable() {
        let algebra = Polyhedra::new();
        let c1 = discharge(&algebra, 1, 2.0, 2.5);
        let c2 = algebra
            .rename(
                &discharge(&algebra, 2, 1.0, 1.5),
                &[("soc2_entry".to_string(), "soc1_exit".to_string())],
            )
            .unwrap();
        let kept = algebra.compose(&c1, &c2, &["soc1_exit".to_string()]).unwrap();
        assert!(kept.has_output("soc1_exit"));
        assert!(!kept.has_input("soc1_exit"));
    }

    #[test]
    fn test_compose_projection_matches_kept_region() {
        let algebra = Polyhedra::new();
        let c1 = discharge(&algebra, 1, 2.0, 2.5);
        let c2 = algebra
            .rename(
                &discharge(&algebra, 2, 1.0, 1.5),
                &[("soc2_entry".to_string(), "soc1_exit".to_string())],
            )
            .unwrap();
        let hidden = algebra.compose(&c1, &c2, &[]).unwrap();
        let kept = algebra.compose(&c1, &c2, &["soc1_exit".to_string()]).unwrap();

        let fix = |c: &Contract| {
            let mut c = c.clone();
            for (v, x) in [("soc1_entry", 90.0), ("duration1", 4.0), ("duration2", 6.0)] {
                let row = Constraint::equal([(v, 1.0)], x);
                let pin = algebra
                    .construct(vec![v.to_string()], vec![], vec![row], vec![])
                    .unwrap();
                c = algebra.merge(&c, &pin).unwrap();
            }
            algebra.variable_bounds(&c, "soc2_exit").unwrap()
        };
        let a = fix(&hidden);
        let b = fix(&kept);
        // 90 - 2.5*4 - 1.5*6 = 71, 90 - 2*4 - 1*6 = 76
        assert_close(a.lower, 71.0);
        assert_close(a.upper, 76.0);
        assert_close(b.lower, 71.0);
        assert_close(b.upper, 76.0);
    }

    #[test]
    fn test_compose_rejects_feedback_and_shared_outputs() {
        let algebra = Polyhedra::new();
        let a = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &[], &["y = x"])
            .unwrap();
        let b = algebra
            .construct_from_strings(names(&["y"]), names(&["x"]), &[], &["x = y"])
            .unwrap();
        assert!(matches!(
            algebra.compose(&a, &b, &[]),
            Err(ContractError::IncompatibleContract { .. })
        ));
        let c = algebra
            .construct_from_strings(names(&["z"]), names(&["y"]), &[], &["y = z"])
            .unwrap();
        assert!(matches!(
            algebra.compose(&a, &c, &[]),
            Err(ContractError::IncompatibleContract { .. })
        ));
    }

    #[test]
    fn test_compose_undischargeable_assumption() {
        let algebra = Polyhedra::new();
        // upstream says nothing about y, downstream needs y >= 1
        let a = algebra
            .construct_from_strings(names(&["x"]), names(&["y"]), &[], &["x >= 0"])
            .unwrap();
        let b = algebra
            .construct_from_strings(names(&["y"]), names(&["z"]), &["y >= 1"], &["z = y"])
            .unwrap();
        assert!(matches!(
            algebra.compose(&a, &b, &[]),
            Err(ContractError::IncompatibleContract { .. })
        ));
    }

    #[test]
    fn test_simplify_removes_redundancy() {
        let algebra = Polyhedra::new();
        let c = algebra
            .construct_from_strings(
                names(&["x"]),
                names(&["y"]),
                &["x >= 0", "x >= -1", "x <= 5", "2*x <= 20"],
                &["y = x", "y <= 10"],
            )
            .unwrap();
        let s = algebra.simplify(&c).unwrap();
        assert_eq!(s.assumptions().len(), 2);
        assert_eq!(s.guarantees().len(), 1);
        assert!(algebra.equivalent(&c, &s).unwrap());
    }

    #[test]
    fn test_project_equalities_and_inequalities() {
        let rows =
            crate::algebra::parse_constraints(&["y = x + 1", "0 <= x <= 2", "z >= y"]).unwrap();
        let eliminate: BTreeSet<String> = ["x".to_string(), "y".to_string()].into();
        let projected = project(rows, &eliminate);
        let algebra = Polyhedra::new();
        assert!(projected.iter().all(|r| !r.mentions("x") && !r.mentions("y")));
        let z_ge_1 = Constraint::less_eq([("z", -1.0)], -1.0);
        assert!(algebra.implies(&projected, &z_ge_1).unwrap());
    }

    #[test]
    fn test_dedupe_keeps_tightest() {
        let rows =
            crate::algebra::parse_constraints(&["x <= 5", "2*x <= 6", "x <= 4", "0 <= 1"])
                .unwrap();
        let rows = dedupe(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rhs(), 6.0);
    }
}
