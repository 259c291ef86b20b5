//! Linear expressions and constraints.
//!
//! A [`Constraint`] is stored in normal form `Σ aᵢ·xᵢ (≤ | =) b`, with
//! variables kept in a `BTreeMap` so that printing and comparison are
//! deterministic. Zero coefficients are never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coefficients below this magnitude are treated as zero.
pub(crate) const COEFF_EPS: f64 = 1e-12;

/// Linear expression `Σ aᵢ·xᵢ + k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub(crate) coeffs: BTreeMap<String, f64>,
    pub(crate) constant: f64,
}

impl LinearExpr {
    /// A constant expression.
    pub fn constant(value: f64) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: value,
        }
    }

    /// A single variable with coefficient 1.
    pub fn var(name: impl Into<String>) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(name.into(), 1.0);
        Self {
            coeffs,
            constant: 0.0,
        }
    }

    /// True when the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Adds `factor · other` to this expression.
    pub fn add_scaled(&mut self, other: &LinearExpr, factor: f64) {
        for (name, coeff) in &other.coeffs {
            add_coeff(&mut self.coeffs, name, factor * coeff);
        }
        self.constant += factor * other.constant;
    }

    /// Multiplies every term by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for coeff in self.coeffs.values_mut() {
            *coeff *= factor;
        }
        self.coeffs.retain(|_, c| c.abs() > COEFF_EPS);
        self.constant *= factor;
    }
}

/// Relation of a normalized constraint to its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// `Σ aᵢ·xᵢ ≤ b`
    LessEq,
    /// `Σ aᵢ·xᵢ = b`
    Equal,
}

/// A linear constraint `Σ aᵢ·xᵢ (≤ | =) b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    coeffs: BTreeMap<String, f64>,
    relation: Relation,
    rhs: f64,
}

impl Constraint {
    /// Creates a constraint from its terms.
    pub fn new<I, S>(terms: I, relation: Relation, rhs: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut coeffs = BTreeMap::new();
        for (name, coeff) in terms {
            add_coeff(&mut coeffs, &name.into(), coeff);
        }
        Self {
            coeffs,
            relation,
            rhs,
        }
    }

    /// `Σ aᵢ·xᵢ ≤ b`.
    pub fn less_eq<I, S>(terms: I, rhs: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(terms, Relation::LessEq, rhs)
    }

    /// `Σ aᵢ·xᵢ = b`.
    pub fn equal<I, S>(terms: I, rhs: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::new(terms, Relation::Equal, rhs)
    }

    /// Builds `expr (≤ | =) 0`, moving the constant to the right-hand side.
    pub(crate) fn from_expr(expr: LinearExpr, relation: Relation) -> Self {
        Self {
            coeffs: expr.coeffs,
            relation,
            rhs: -expr.constant + 0.0,
        }
    }

    /// Variable coefficients.
    pub fn coeffs(&self) -> &BTreeMap<String, f64> {
        &self.coeffs
    }

    /// Coefficient of `name` (0 if absent).
    pub fn coeff(&self, name: &str) -> f64 {
        self.coeffs.get(name).copied().unwrap_or(0.0)
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// True if the constraint mentions `name`.
    pub fn mentions(&self, name: &str) -> bool {
        self.coeffs.contains_key(name)
    }

    /// Names of the variables the constraint mentions.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.coeffs.keys().map(String::as_str)
    }

    /// True when no variable appears.
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// For a constant constraint, whether `0 (≤ | =) rhs` holds.
    pub(crate) fn holds_trivially(&self, tol: f64) -> bool {
        match self.relation {
            Relation::LessEq => self.rhs >= -tol,
            Relation::Equal => self.rhs.abs() <= tol,
        }
    }

    /// True when every coefficient and the right-hand side are finite.
    pub fn is_finite(&self) -> bool {
        self.rhs.is_finite() && self.coeffs.values().all(|c| c.is_finite())
    }

    /// Splits an equality into the two inequalities it stands for.
    pub(crate) fn as_inequalities(&self) -> Vec<Constraint> {
        match self.relation {
            Relation::LessEq => vec![self.clone()],
            Relation::Equal => {
                let mut negated = self.clone();
                negated.negate();
                negated.relation = Relation::LessEq;
                let mut le = self.clone();
                le.relation = Relation::LessEq;
                vec![le, negated]
            }
        }
    }

    /// `self - factor · other`, keeping `self`'s relation.
    pub(crate) fn minus_scaled(&self, other: &Constraint, factor: f64) -> Constraint {
        let mut result = self.clone();
        for (name, coeff) in &other.coeffs {
            add_coeff(&mut result.coeffs, name, -factor * coeff);
        }
        result.rhs -= factor * other.rhs;
        result
    }

    /// Returns a copy with variables renamed through `map`.
    pub(crate) fn renamed(&self, map: &BTreeMap<&str, &str>) -> Constraint {
        let terms = self.coeffs.iter().map(|(name, coeff)| {
            let target = map.get(name.as_str()).copied().unwrap_or(name.as_str());
            (target.to_string(), *coeff)
        });
        Constraint::new(terms, self.relation, self.rhs)
    }

    fn negate(&mut self) {
        for coeff in self.coeffs.values_mut() {
            *coeff = -*coeff;
        }
        self.rhs = -self.rhs;
    }

    /// Scales the constraint so its largest coefficient magnitude is 1.
    /// Equalities are additionally sign-normalized.
    pub(crate) fn normalized(&self) -> Constraint {
        let scale = self
            .coeffs
            .values()
            .fold(0.0_f64, |acc, c| acc.max(c.abs()));
        if scale <= COEFF_EPS {
            return self.clone();
        }
        let mut result = self.clone();
        for coeff in result.coeffs.values_mut() {
            *coeff /= scale;
        }
        result.rhs /= scale;
        if result.relation == Relation::Equal {
            if let Some(first) = result.coeffs.values().next() {
                if *first < 0.0 {
                    result.negate();
                }
            }
        }
        result
    }

    /// True when both constraints have the same variables and
    /// (approximately) the same normalized coefficients.
    pub(crate) fn same_direction(&self, other: &Constraint, tol: f64) -> bool {
        self.relation == other.relation
            && self.coeffs.len() == other.coeffs.len()
            && self.coeffs.iter().all(|(name, a)| {
                other
                    .coeffs
                    .get(name)
                    .is_some_and(|b| (a - b).abs() <= tol)
            })
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeffs.is_empty() {
            write!(f, "0")?;
        }
        for (i, (name, coeff)) in self.coeffs.iter().enumerate() {
            let magnitude = coeff.abs();
            let sign = if *coeff < 0.0 { "-" } else { "+" };
            if i == 0 {
                if *coeff < 0.0 {
                    write!(f, "-")?;
                }
            } else {
                write!(f, " {sign} ")?;
            }
            if (magnitude - 1.0).abs() > COEFF_EPS {
                write!(f, "{magnitude}*")?;
            }
            write!(f, "{name}")?;
        }
        let op = match self.relation {
            Relation::LessEq => "<=",
            Relation::Equal => "=",
        };
        write!(f, " {op} {}", self.rhs + 0.0)
    }
}

fn add_coeff(coeffs: &mut BTreeMap<String, f64>, name: &str, delta: f64) {
    let entry = coeffs.entry(name.to_string()).or_insert(0.0);
    *entry += delta;
    if entry.abs() <= COEFF_EPS {
        coeffs.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_coefficients_dropped() {
        let c = Constraint::less_eq([("x", 1.0), ("y", 0.0), ("x", -1.0)], 3.0);
        assert!(c.is_constant());
        assert!(c.holds_trivially(1e-9));
    }

    #[test]
    fn test_equality_split() {
        let c = Constraint::equal([("x", 2.0), ("y", -1.0)], 4.0);
        let parts = c.as_inequalities();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].coeff("x"), -2.0);
        assert_eq!(parts[1].rhs(), -4.0);
    }

    #[test]
    fn test_minus_scaled_cancels_variable() {
        let a = Constraint::less_eq([("x", 2.0), ("y", 1.0)], 4.0);
        let b = Constraint::less_eq([("x", 1.0), ("z", 1.0)], 1.0);
        let c = a.minus_scaled(&b, 2.0);
        assert!(!c.mentions("x"));
        assert_eq!(c.coeff("z"), -2.0);
        assert_eq!(c.rhs(), 2.0);
    }

    #[test]
    fn test_display() {
        let c = Constraint::less_eq([("soc1_exit", -1.0), ("duration_dsn1", 2.5)], 0.0);
        assert_eq!(c.to_string(), "2.5*duration_dsn1 - soc1_exit <= 0");
    }

    #[test]
    fn test_normalized_direction() {
        let a = Constraint::less_eq([("x", 2.0), ("y", -4.0)], 8.0).normalized();
        let b = Constraint::less_eq([("x", 0.5), ("y", -1.0)], 1.0).normalized();
        assert!(a.same_direction(&b, 1e-9));
        assert_eq!(a.rhs(), 2.0);
    }
}
