// SPDX-License-Identifier: AGPL-3.0-only

//! Fourier phase table, one factor per (local site, requested momentum).
//!
//! For momentum p⃗ the factor at site x⃗ is built axis by axis, x → y → z,
//! starting from 1. Each axis angle is
//!
//!   θ_μ = (2π / L_μ) (x_μ - r0_μ) p_μ
//!
//! and the axis parity tag selects how θ_μ is folded into the running
//! factor z:
//!
//! | Tag | Rule | Weight on that axis |
//! |-----|------|---------------------|
//! | EVEN | z ← z cos θ | cos(p x) |
//! | ODD | z ← i z sin θ | sin(p x) |
//! | EVENANDODD | z ← z e^{iθ} | exp(i p x) |
//!
//! so a request such as (EVEN, ODD, EVENANDODD) yields
//! cos(kx x) · i sin(ky y) · exp(i kz z). The axis order is part of the
//! interface convention and must not be reordered.

use rayon::prelude::*;
use std::f64::consts::PI;

use super::args::MomentumRequest;
use super::cost::phase_table_flops;
use super::zeroed_buffer;
use crate::error::ContractError;
use crate::lattice::complex_f64::Complex64;
use crate::lattice::constants::N_SPATIAL;
use crate::lattice::geometry::LocalGeometry;

/// Per-axis rule for folding a phase angle into the running factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parity {
    /// cos θ weighting (reflection-symmetric signal).
    Even,
    /// sin θ weighting (reflection-antisymmetric signal).
    Odd,
    /// Full e^{iθ} rotation.
    EvenAndOdd,
}

impl Parity {
    /// Raw interface code for `Even`.
    pub const EVEN: u8 = 0x02;
    /// Raw interface code for `Odd`.
    pub const ODD: u8 = 0x01;
    /// Raw interface code for `EvenAndOdd`.
    pub const EVEN_AND_ODD: u8 = 0x03;

    /// Raw interface code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Even => Self::EVEN,
            Self::Odd => Self::ODD,
            Self::EvenAndOdd => Self::EVEN_AND_ODD,
        }
    }

    /// Decode a raw tag; anything outside the three codes is a configuration error.
    pub fn from_code(code: u8, node: usize) -> Result<Self, ContractError> {
        match code {
            Self::EVEN => Ok(Self::Even),
            Self::ODD => Ok(Self::Odd),
            Self::EVEN_AND_ODD => Ok(Self::EvenAndOdd),
            value => Err(ContractError::BadParity { node, value }),
        }
    }

    /// Fold angle `theta` into the running factor `z`.
    #[inline]
    #[must_use]
    pub fn combine(self, theta: f64, z: Complex64) -> Complex64 {
        match self {
            Self::Even => {
                let c = theta.cos();
                Complex64::new(z.re * c, z.im * c)
            }
            Self::Odd => {
                let s = theta.sin();
                Complex64::new(-z.im * s, z.re * s)
            }
            Self::EvenAndOdd => {
                let (s, c) = theta.sin_cos();
                Complex64::new(z.re * c - z.im * s, z.im * c + z.re * s)
            }
        }
    }
}

/// 2π / L for each spatial axis.
#[must_use]
pub fn axis_factors(dims: [usize; 4]) -> [f64; N_SPATIAL] {
    std::array::from_fn(|mu| 2.0 * PI / dims[mu] as f64)
}

/// Composed phase factor for one site and one momentum.
#[must_use]
pub fn phase_factor(
    fact: [f64; N_SPATIAL],
    x: [usize; 4],
    r0: [i32; N_SPATIAL],
    momentum: [i32; N_SPATIAL],
    parity: [Parity; N_SPATIAL],
) -> Complex64 {
    let mut z = Complex64::ONE;
    for mu in 0..N_SPATIAL {
        let dx = (x[mu] as i64 - i64::from(r0[mu])) as f64;
        let theta = fact[mu] * dx * f64::from(momentum[mu]);
        z = parity[mu].combine(theta, z);
    }
    z
}

/// Dense phase table: `n_sites` rows of `n_mom` factors each.
#[derive(Debug)]
pub struct PhaseTable {
    n_sites: usize,
    n_mom: usize,
    data: Vec<Complex64>,
}

impl PhaseTable {
    /// Build the table for every site owned by `geometry`.
    ///
    /// Parity tags are decoded before any allocation, so a bad tag fails
    /// without touching memory. Site rows are filled in parallel; each row
    /// is written by exactly one task.
    pub fn build<G: LocalGeometry + ?Sized>(
        geometry: &G,
        momenta: &[MomentumRequest],
        r0: [i32; 3],
    ) -> Result<Self, ContractError> {
        let node = geometry.node();
        let n_sites = geometry.sites_on_node();
        let n_mom = momenta.len();

        let parities = momenta
            .iter()
            .map(|m| m.parities(node))
            .collect::<Result<Vec<_>, _>>()?;

        let mut data = zeroed_buffer(
            &[n_sites, n_mom],
            Complex64::ZERO,
            "phase_table",
            node,
            "Fourier phases",
        )?;

        if n_mom > 0 {
            let fact = axis_factors(geometry.dims());
            data.par_chunks_mut(n_mom)
                .enumerate()
                .for_each(|(i, row)| {
                    let x = geometry.coords(i);
                    for ((cell, req), parity) in row.iter_mut().zip(momenta).zip(&parities) {
                        *cell = phase_factor(fact, x, r0, req.momentum, *parity);
                    }
                });
        }

        Ok(Self {
            n_sites,
            n_mom,
            data,
        })
    }

    #[must_use]
    pub const fn n_sites(&self) -> usize {
        self.n_sites
    }

    #[must_use]
    pub const fn n_mom(&self) -> usize {
        self.n_mom
    }

    /// Factors of local site `i` for every momentum.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[Complex64] {
        &self.data[i * self.n_mom..(i + 1) * self.n_mom]
    }

    /// Factor of local site `i`, momentum `k`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, k: usize) -> Complex64 {
        self.data[k + self.n_mom * i]
    }

    /// Flops spent building this table.
    #[must_use]
    pub fn build_flops(&self) -> f64 {
        phase_table_flops(self.n_sites, self.n_mom)
    }

    /// Free the table.
    pub fn release(self) {
        drop(self);
    }
}
