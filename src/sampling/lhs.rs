//! Latin hypercube sampling.
//!
//! # Algorithm
//!
//! For `n` samples in `d` dimensions, each dimension gets an independent
//! random permutation `π` of `0..n`; sample `i` takes
//! `(π(i) + U(0,1)) / n` in that dimension. Every one of the `n`
//! equal-width strata of every dimension therefore holds exactly one sample.
//!
//! # Reference
//! McKay, Beckman & Conover (1979), "A Comparison of Three Methods for
//! Selecting Values of Input Variables in the Analysis of Output from a
//! Computer Code"

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded Latin hypercube sampler over `[0, 1)^d`.
///
/// # Example
/// ```
/// use mission_contracts::sampling::LatinHypercube;
///
/// let mut lhs = LatinHypercube::new(3, 42);
/// let points = lhs.sample(10);
/// assert_eq!(points.len(), 10);
/// assert!(points.iter().all(|p| p.len() == 3));
/// ```
#[derive(Debug, Clone)]
pub struct LatinHypercube {
    dimensions: usize,
    rng: SmallRng,
}

impl LatinHypercube {
    pub fn new(dimensions: usize, seed: u64) -> Self {
        Self {
            dimensions,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Draws `n` points; row `i` is sample `i`.
    pub fn sample(&mut self, n: usize) -> Vec<Vec<f64>> {
        let mut points = vec![vec![0.0; self.dimensions]; n];
        if n == 0 {
            return points;
        }
        let mut strata: Vec<usize> = (0..n).collect();
        for dim in 0..self.dimensions {
            strata.shuffle(&mut self.rng);
            for (point, &stratum) in points.iter_mut().zip(&strata) {
                let jitter: f64 = self.rng.random::<f64>();
                point[dim] = (stratum as f64 + jitter) / n as f64;
            }
        }
        points
    }
}

/// Maps unit-cube points onto the box `[lower, upper]` per dimension.
pub fn scale(points: &[Vec<f64>], lower: &[f64], upper: &[f64]) -> Vec<Vec<f64>> {
    points
        .iter()
        .map(|p| {
            p.iter()
                .zip(lower.iter().zip(upper))
                .map(|(x, (lo, hi))| lo + x * (hi - lo))
                .collect()
        })
        .collect()
}
