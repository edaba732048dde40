// SPDX-License-Identifier: AGPL-3.0-only

//! Staggered color-vector fields.
//!
//! A staggered propagator column carries one complex color 3-vector per
//! lattice site. The meson contraction combines two such fields site by
//! site through the color inner product
//!
//!   ⟨a | b⟩(x) = Σ_c a_c(x)* b_c(x)

use super::complex_f64::Complex64;
use super::constants::{lcg_uniform_f64, N_COLORS};

/// Color vector at a single lattice site: 3 complex components.
pub type ColorVector = [Complex64; N_COLORS];

/// Color inner product ⟨a | b⟩ = Σ_c conj(a_c) × b_c.
#[inline]
#[must_use]
pub fn color_dot(a: &ColorVector, b: &ColorVector) -> Complex64 {
    let mut sum = Complex64::ZERO;
    for c in 0..N_COLORS {
        sum += a[c].conj() * b[c];
    }
    sum
}

/// Staggered fermion field: one `ColorVector` per local site.
#[derive(Clone, Debug)]
pub struct ColorField {
    pub data: Vec<ColorVector>,
}

impl ColorField {
    /// Create a zero field.
    #[must_use]
    pub fn zeros(volume: usize) -> Self {
        Self {
            data: vec![[Complex64::ZERO; N_COLORS]; volume],
        }
    }

    /// Deterministic pseudo-random field with entries in [-0.5, 0.5)².
    #[must_use]
    pub fn random(volume: usize, seed: u64) -> Self {
        let mut rng = seed;
        let mut data = vec![[Complex64::ZERO; N_COLORS]; volume];
        for site in &mut data {
            for c in site.iter_mut() {
                let re = lcg_uniform_f64(&mut rng) - 0.5;
                let im = lcg_uniform_f64(&mut rng) - 0.5;
                *c = Complex64::new(re, im);
            }
        }
        Self { data }
    }

    /// Number of sites.
    #[must_use]
    pub fn volume(&self) -> usize {
        self.data.len()
    }

    /// Site-by-site inner products ⟨self(x) | other(x)⟩.
    #[must_use]
    pub fn site_dots(&self, other: &Self) -> Vec<Complex64> {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| color_dot(a, b))
            .collect()
    }

    /// Scale in place: self *= a
    pub fn scale_inplace(&mut self, a: f64) {
        for site in &mut self.data {
            for c in site.iter_mut() {
                *c = c.scale(a);
            }
        }
    }
}
