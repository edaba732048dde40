// SPDX-License-Identifier: AGPL-3.0-only

//! Contraction hot loop (Rayon-parallelized).
//!
//! Local sites are split into one contiguous range per worker. Worker `w`
//! walks its range, forms the color inner product ⟨ψ̄ | ψ⟩ at each site,
//! and scatters `value × φ_k` into its own (t, k) accumulators.

use rayon::prelude::*;
use std::ops::Range;

use super::accumulator::ThreadAccumulatorPool;
use super::cost::{kernel_flops, CostMeter};
use super::phase::PhaseTable;
use crate::error::ContractError;
use crate::lattice::field::{color_dot, ColorVector};
use crate::lattice::geometry::LocalGeometry;

/// Contiguous site range handled by `worker` out of `workers`.
#[must_use]
pub fn site_partition(sites: usize, workers: usize, worker: usize) -> Range<usize> {
    let chunk = sites.div_ceil(workers.max(1));
    let start = worker.saturating_mul(chunk).min(sites);
    let end = start.saturating_add(chunk).min(sites);
    start..end
}

/// Accumulate every local site into the pool.
///
/// With an empty momentum list the inner products are still formed and
/// time slices still flagged, but no slot is written.
pub fn accumulate<G: LocalGeometry + ?Sized>(
    geometry: &G,
    antiquark: &[ColorVector],
    quark: &[ColorVector],
    phases: &PhaseTable,
    pool: &mut ThreadAccumulatorPool,
    cost: &mut CostMeter,
) -> Result<(), ContractError> {
    let sites = geometry.sites_on_node();
    ContractError::check_len("antiquark field", sites, antiquark.len())?;
    ContractError::check_len("quark field", sites, quark.len())?;
    ContractError::check_len("phase table sites", sites, phases.n_sites())?;
    ContractError::check_len("phase table momenta", pool.n_mom(), phases.n_mom())?;
    ContractError::check_len("time extent", pool.nt(), geometry.nt())?;

    let workers = pool.workers();
    pool.worker_rows_mut()?.into_par_iter().for_each(|mut rows| {
        for i in site_partition(sites, workers, rows.worker) {
            let meson = color_dot(&antiquark[i], &quark[i]);
            let t = geometry.coords(i)[3];
            rows.accumulate(t, meson, phases.row(i));
        }
    });

    cost.add_flops("kernel", kernel_flops(sites, phases.n_mom()));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lattice::complex_f64::Complex64;
    use crate::lattice::field::ColorField;
    use crate::lattice::geometry::{LocalLattice, TimeSlab};
    use crate::lattice::meson::args::MomentumRequest;

    #[test]
    fn partition_covers_all_sites_once() {
        for (sites, workers) in [(10, 3), (64, 8), (5, 8), (0, 4), (7, 1)] {
            let mut seen = vec![0u8; sites];
            for w in 0..workers {
                for i in site_partition(sites, workers, w) {
                    seen[i] += 1;
                }
            }
            assert!(seen.iter().all(|&n| n == 1), "sites={sites} workers={workers}");
        }
    }

    #[test]
    fn partition_saturates_for_huge_worker_counts() {
        let workers = usize::MAX / 2;
        assert_eq!(site_partition(10, workers, 3), 3..4);
        assert!(site_partition(10, workers, workers - 1).is_empty());
        assert_eq!(site_partition(usize::MAX, 4, 3).end, usize::MAX);
    }

    #[test]
    fn single_site_lands_in_its_time_slice() {
        let lat = LocalLattice::new([1, 1, 1, 3]);
        let mut anti = ColorField::zeros(3);
        let mut quark = ColorField::zeros(3);
        anti.data[2][0] = Complex64::ONE;
        quark.data[2][0] = Complex64::new(0.0, 2.0);
        let phases = PhaseTable::build(&lat, &[MomentumRequest::fourier([0, 0, 0])], [0; 3])
            .unwrap();
        let mut pool = ThreadAccumulatorPool::acquire(1, 3, 1, 0).unwrap();
        let mut cost = CostMeter::start();
        accumulate(&lat, &anti.data, &quark.data, &phases, &mut pool, &mut cost).unwrap();
        assert_eq!(pool.slot(0, 2, 0), Complex64::new(0.0, 2.0));
        assert_eq!(pool.slot(0, 0, 0), Complex64::ZERO);
        assert!((cost.flops() - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flags_match_owned_time_slices() {
        let slab = TimeSlab::new([2, 2, 2, 6], 1, 3, 0);
        let n = slab.sites_on_node();
        let anti = ColorField::random(n, 1);
        let quark = ColorField::random(n, 2);
        let phases = PhaseTable::build(&slab, &[MomentumRequest::fourier([1, 0, 0])], [0; 3])
            .unwrap();
        let mut pool = ThreadAccumulatorPool::acquire(4, 6, 1, 0).unwrap();
        let mut cost = CostMeter::start();
        accumulate(&slab, &anti.data, &quark.data, &phases, &mut pool, &mut cost).unwrap();
        assert_eq!(pool.nonzero().slices().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn mismatched_field_rejected() {
        let lat = LocalLattice::new([2, 2, 2, 2]);
        let anti = ColorField::zeros(16);
        let quark = ColorField::zeros(15);
        let phases = PhaseTable::build(&lat, &[], [0; 3]).unwrap();
        let mut pool = ThreadAccumulatorPool::acquire(1, 2, 0, 0).unwrap();
        let mut cost = CostMeter::start();
        let err =
            accumulate(&lat, &anti.data, &quark.data, &phases, &mut pool, &mut cost).unwrap_err();
        assert!(err.to_string().contains("quark field"));
        assert!(pool.is_clear());
    }
}
