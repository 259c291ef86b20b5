//! Dense two-phase simplex over free variables.
//!
//! Every variable `x` is split into `x⁺ − x⁻` with `x⁺, x⁻ ≥ 0`; each `≤`
//! row gets a slack, rows with a negative right-hand side and all equality
//! rows get an artificial. Phase 1 minimizes the artificials, phase 2 the
//! requested objective. Bland's rule is used for both entering and leaving
//! variables, so the method cannot cycle.
//!
//! # Reference
//! Chvátal (1983), "Linear Programming", Ch. 2-3 (Bland's rule, two-phase method)

use std::collections::{BTreeMap, BTreeSet};

use super::linear::{Constraint, Relation};
use crate::error::ContractError;

const PIVOT_EPS: f64 = 1e-9;
const ZERO_EPS: f64 = 1e-13;
/// Absolute feasibility tolerance.
pub(crate) const FEAS_TOL: f64 = 1e-7;
const MAX_PIVOTS: usize = 100_000;

/// Result of a minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum LpOutcome {
    Infeasible,
    Unbounded,
    Optimal(f64),
}

/// Minimizes `objective · x` subject to `rows`.
pub(crate) fn minimize(
    rows: &[Constraint],
    objective: &BTreeMap<String, f64>,
) -> Result<LpOutcome, ContractError> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut kept: Vec<&Constraint> = Vec::with_capacity(rows.len());
    for row in rows {
        if row.is_constant() {
            if !row.holds_trivially(FEAS_TOL) {
                return Ok(LpOutcome::Infeasible);
            }
            continue;
        }
        names.extend(row.variables());
        kept.push(row);
    }
    names.extend(objective.keys().map(String::as_str));
    let index: BTreeMap<&str, usize> = names.into_iter().enumerate().map(|(i, n)| (n, i)).collect();

    let mut tableau = Tableau::build(&kept, &index);

    // Phase 1: drive the artificials to zero.
    if tableau.first_artificial < tableau.width {
        let mut cost = vec![0.0; tableau.width + 1];
        for c in cost.iter_mut().take(tableau.width).skip(tableau.first_artificial) {
            *c = 1.0;
        }
        for r in 0..tableau.rows.len() {
            if tableau.basis[r] >= tableau.first_artificial {
                for (c, v) in cost.iter_mut().zip(&tableau.rows[r]) {
                    *c -= v;
                }
            }
        }
        tableau.optimize(&mut cost, tableau.width)?;
        if -cost[tableau.width] > FEAS_TOL {
            return Ok(LpOutcome::Infeasible);
        }
        tableau.drop_artificials();
    }

    if objective.is_empty() {
        return Ok(LpOutcome::Optimal(0.0));
    }

    // Phase 2.
    let mut cost = vec![0.0; tableau.width + 1];
    for (name, coeff) in objective {
        let k = index[name.as_str()];
        cost[2 * k] = *coeff;
        cost[2 * k + 1] = -*coeff;
    }
    for r in 0..tableau.rows.len() {
        let cb = cost[tableau.basis[r]];
        if cb != 0.0 {
            for (c, v) in cost.iter_mut().zip(&tableau.rows[r]) {
                *c -= cb * v;
            }
        }
    }
    let limit = tableau.first_artificial;
    if tableau.optimize(&mut cost, limit)? {
        Ok(LpOutcome::Optimal(-cost[tableau.width]))
    } else {
        Ok(LpOutcome::Unbounded)
    }
}

/// True when `rows` admit at least one solution.
pub(crate) fn feasible(rows: &[Constraint]) -> Result<bool, ContractError> {
    Ok(minimize(rows, &BTreeMap::new())? != LpOutcome::Infeasible)
}

struct Tableau {
    /// Each row has `width + 1` entries; the last one is the right-hand side.
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    width: usize,
    first_artificial: usize,
    pivots: usize,
}

impl Tableau {
    fn build(rows: &[&Constraint], index: &BTreeMap<&str, usize>) -> Self {
        let structural = 2 * index.len();
        let slacks = rows.iter().filter(|r| r.relation() == Relation::LessEq).count();
        let artificials = rows
            .iter()
            .filter(|r| r.relation() == Relation::Equal || r.rhs() < 0.0)
            .count();
        let first_artificial = structural + slacks;
        let width = first_artificial + artificials;

        let mut tableau = Self {
            rows: Vec::with_capacity(rows.len()),
            basis: Vec::with_capacity(rows.len()),
            width,
            first_artificial,
            pivots: 0,
        };

        let mut slack_col = structural;
        let mut art_col = first_artificial;
        for constraint in rows {
            let mut row = vec![0.0; width + 1];
            for (name, coeff) in constraint.coeffs() {
                let k = index[name.as_str()];
                row[2 * k] = *coeff;
                row[2 * k + 1] = -*coeff;
            }
            row[width] = constraint.rhs();
            if constraint.relation() == Relation::LessEq {
                row[slack_col] = 1.0;
                slack_col += 1;
            }
            let needs_artificial =
                constraint.relation() == Relation::Equal || constraint.rhs() < 0.0;
            if needs_artificial {
                if row[width] < 0.0 {
                    for v in row.iter_mut() {
                        *v = -*v;
                    }
                }
                row[art_col] = 1.0;
                tableau.basis.push(art_col);
                art_col += 1;
            } else {
                tableau.basis.push(slack_col - 1);
            }
            tableau.rows.push(row);
        }
        tableau
    }

    /// Runs simplex iterations on `cost` over columns `0..limit`.
    /// Returns `false` if the objective is unbounded below.
    fn optimize(&mut self, cost: &mut [f64], limit: usize) -> Result<bool, ContractError> {
        loop {
            let Some(enter) = (0..limit).find(|&j| cost[j] < -PIVOT_EPS) else {
                return Ok(true);
            };

            let mut leave: Option<usize> = None;
            let mut best = f64::INFINITY;
            for (r, row) in self.rows.iter().enumerate() {
                let a = row[enter];
                if a <= PIVOT_EPS {
                    continue;
                }
                let ratio = row[self.width] / a;
                let better = match leave {
                    None => true,
                    Some(l) => {
                        ratio < best - PIVOT_EPS
                            || ((ratio - best).abs() <= PIVOT_EPS && self.basis[r] < self.basis[l])
                    }
                };
                if better {
                    leave = Some(r);
                    best = ratio;
                }
            }
            let Some(r) = leave else {
                return Ok(false);
            };

            self.pivot(r, enter, cost);
            self.pivots += 1;
            if self.pivots > MAX_PIVOTS {
                return Err(ContractError::SolverStalled {
                    iterations: self.pivots,
                });
            }
        }
    }

    fn pivot(&mut self, r: usize, c: usize, cost: &mut [f64]) {
        let p = self.rows[r][c];
        for v in self.rows[r].iter_mut() {
            *v /= p;
        }
        let pivot_row = self.rows[r].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[c];
            if f == 0.0 {
                continue;
            }
            for (v, p) in row.iter_mut().zip(&pivot_row) {
                *v -= f * p;
                if v.abs() < ZERO_EPS {
                    *v = 0.0;
                }
            }
        }
        let f = cost[c];
        if f != 0.0 {
            for (v, p) in cost.iter_mut().zip(&pivot_row) {
                *v -= f * p;
            }
        }
        self.basis[r] = c;
    }

    /// Pivots artificials out of the basis after phase 1, dropping rows
    /// that turn out to be linearly dependent.
    fn drop_artificials(&mut self) {
        let mut scratch = vec![0.0; self.width + 1];
        let mut r = 0;
        while r < self.rows.len() {
            if self.basis[r] < self.first_artificial {
                r += 1;
                continue;
            }
            let column = (0..self.first_artificial).find(|&j| self.rows[r][j].abs() > PIVOT_EPS);
            match column {
                Some(j) => {
                    self.pivot(r, j, &mut scratch);
                    r += 1;
                }
                None => {
                    self.rows.remove(r);
                    self.basis.remove(r);
                }
            }
        }
    }
}
