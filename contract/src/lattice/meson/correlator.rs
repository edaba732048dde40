// SPDX-License-Identifier: AGPL-3.0-only

//! Caller-owned meson correlator C(t, p).
//!
//! The contraction adds into this array; it never overwrites. Repeated
//! calls (one per spin-taste or color component, say) therefore sum.

use serde::{Deserialize, Serialize};

use crate::lattice::complex_f64::Complex64;

/// Time × momentum correlator, row-major (t slowest).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MesonCorrelator {
    nt: usize,
    n_mom: usize,
    data: Vec<Complex64>,
}

impl MesonCorrelator {
    /// Zeroed correlator with `nt` time slices and `n_mom` momenta.
    #[must_use]
    pub fn zeros(nt: usize, n_mom: usize) -> Self {
        Self {
            nt,
            n_mom,
            data: vec![Complex64::ZERO; nt * n_mom],
        }
    }

    /// Build from per-time-slice rows (`rows[t][k]`); `None` if rows are ragged.
    #[must_use]
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Option<Self> {
        let n_mom = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_mom) {
            return None;
        }
        Some(Self {
            nt: rows.len(),
            n_mom,
            data: rows.concat(),
        })
    }

    #[must_use]
    pub const fn nt(&self) -> usize {
        self.nt
    }

    #[must_use]
    pub const fn n_mom(&self) -> usize {
        self.n_mom
    }

    #[inline]
    #[must_use]
    pub fn get(&self, t: usize, k: usize) -> Complex64 {
        self.data[t * self.n_mom + k]
    }

    #[inline]
    #[must_use]
    pub fn row(&self, t: usize) -> &[Complex64] {
        &self.data[t * self.n_mom..(t + 1) * self.n_mom]
    }

    #[inline]
    pub fn row_mut(&mut self, t: usize) -> &mut [Complex64] {
        &mut self.data[t * self.n_mom..(t + 1) * self.n_mom]
    }

    /// Per-time-slice rows (`rows[t][k]`).
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<Complex64>> {
        (0..self.nt).map(|t| self.row(t).to_vec()).collect()
    }

    /// Momentum component `k` as a function of t.
    #[must_use]
    pub fn momentum_series(&self, k: usize) -> Vec<Complex64> {
        (0..self.nt).map(|t| self.get(t, k)).collect()
    }

    /// Largest component-wise difference to another correlator of the same shape.
    #[must_use]
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a.max_abs_diff(*b))
            .fold(0.0, f64::max)
    }

    /// Largest |C(t, p)| component.
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .map(|z| z.re.abs().max(z.im.abs()))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_shape() {
        let c = MesonCorrelator::zeros(8, 3);
        assert_eq!(c.nt(), 8);
        assert_eq!(c.n_mom(), 3);
        assert!(c.max_abs().abs() < f64::EPSILON);
    }

    #[test]
    fn rows_roundtrip() {
        let rows = vec![
            vec![Complex64::new(1.0, 0.0), Complex64::new(2.0, 1.0)],
            vec![Complex64::new(3.0, -1.0), Complex64::new(4.0, 0.5)],
        ];
        let c = MesonCorrelator::from_rows(&rows).unwrap();
        assert_eq!(c.get(1, 0), Complex64::new(3.0, -1.0));
        assert_eq!(c.to_rows(), rows);
        assert_eq!(
            c.momentum_series(1),
            vec![Complex64::new(2.0, 1.0), Complex64::new(4.0, 0.5)]
        );
    }

    #[test]
    fn ragged_rows_rejected() {
        let rows = vec![vec![Complex64::ONE], vec![]];
        assert!(MesonCorrelator::from_rows(&rows).is_none());
    }

    #[test]
    fn row_mut_edits_one_slice() {
        let mut c = MesonCorrelator::zeros(3, 2);
        c.row_mut(1)[1] += Complex64::I;
        assert_eq!(c.get(1, 1), Complex64::I);
        assert!((c.max_abs() - 1.0).abs() < f64::EPSILON);
        assert!((c.max_abs_diff(&MesonCorrelator::zeros(3, 2)) - 1.0).abs() < f64::EPSILON);
    }
}
