// SPDX-License-Identifier: AGPL-3.0-only

//! Thread-partitioned accumulators and the deterministic reduction.
//!
//! Storage is one flat buffer of `workers × nt × N` complex slots. Worker
//! `w` owns the contiguous block `[w·nt·N, (w+1)·nt·N)` together with its
//! own `nt` non-zero flags, handed out as disjoint `&mut` slices. No cell
//! is ever reachable from two workers, so accumulation needs no locks.
//!
//! The reduction walks workers in index order, then time slices, then
//! momenta, adding each cell into the output and zeroing it. Time slices
//! that no worker touched are skipped entirely, which keeps nodes that own
//! only part of the time extent from adding zeros into slices owned by
//! other nodes.

use super::correlator::MesonCorrelator;
use super::cost::{reduction_flops, CostMeter};
use super::zeroed_buffer;
use crate::error::ContractError;
use crate::lattice::complex_f64::Complex64;

/// Time slices that received at least one site contribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonZeroFlags(Vec<bool>);

impl NonZeroFlags {
    /// All-clear flags for `nt` time slices.
    #[must_use]
    pub fn new(nt: usize) -> Self {
        Self(vec![false; nt])
    }

    #[must_use]
    pub fn is_set(&self, t: usize) -> bool {
        self.0[t]
    }

    /// Flagged time slices in increasing order.
    pub fn slices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(t, &set)| set.then_some(t))
    }

    /// Number of flagged slices.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().filter(|&&set| set).count()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// One worker's exclusive view: `nt × N` slots and `nt` flags.
#[derive(Debug)]
pub struct WorkerRows<'a> {
    pub worker: usize,
    n_mom: usize,
    slots: &'a mut [Complex64],
    flags: &'a mut [bool],
}

impl WorkerRows<'_> {
    /// Add `value × phases[k]` into slot (t, k) for every k, and flag t.
    #[inline]
    pub fn accumulate(&mut self, t: usize, value: Complex64, phases: &[Complex64]) {
        self.flags[t] = true;
        let row = &mut self.slots[t * self.n_mom..(t + 1) * self.n_mom];
        for (acc, &phase) in row.iter_mut().zip(phases) {
            *acc += value * phase;
        }
    }
}

/// Zero-initialized per-worker, per-time-slice, per-momentum accumulators.
#[derive(Debug)]
pub struct ThreadAccumulatorPool {
    node: usize,
    workers: usize,
    nt: usize,
    n_mom: usize,
    slots: Vec<Complex64>,
    flags: Vec<bool>,
}

impl ThreadAccumulatorPool {
    /// Allocate `workers × nt` rows of `n_mom` zeroed slots.
    ///
    /// `workers` is clamped to at least one. A cell count that overflows
    /// `usize` or cannot be reserved is an allocation error, as is a worker
    /// count too large to hand out one view per worker.
    pub fn acquire(
        workers: usize,
        nt: usize,
        n_mom: usize,
        node: usize,
    ) -> Result<Self, ContractError> {
        let workers = workers.max(1);
        let slots = zeroed_buffer(
            &[workers, nt, n_mom],
            Complex64::ZERO,
            "accumulator_pool",
            node,
            "thread accumulators",
        )?;
        let flags = zeroed_buffer(&[workers, nt], false, "accumulator_pool", node, "nonzero flags")?;
        Ok(Self {
            node,
            workers,
            nt,
            n_mom,
            slots,
            flags,
        })
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub const fn nt(&self) -> usize {
        self.nt
    }

    #[must_use]
    pub const fn n_mom(&self) -> usize {
        self.n_mom
    }

    /// Accumulated value of (worker, t, k).
    #[must_use]
    pub fn slot(&self, worker: usize, t: usize, k: usize) -> Complex64 {
        self.slots[(worker * self.nt + t) * self.n_mom + k]
    }

    /// Split the pool into one exclusive view per worker, in worker order.
    pub fn worker_rows_mut(&mut self) -> Result<Vec<WorkerRows<'_>>, ContractError> {
        let block = self.nt * self.n_mom;
        let mut rows: Vec<WorkerRows<'_>> = Vec::new();
        rows.try_reserve_exact(self.workers)
            .map_err(|_| ContractError::Allocation {
                component: "accumulator_pool",
                node: self.node,
                buffer: "worker views",
            })?;
        let mut slots = self.slots.as_mut_slice();
        let mut flags = self.flags.as_mut_slice();
        for worker in 0..self.workers {
            let (own_slots, rest_slots) = std::mem::take(&mut slots).split_at_mut(block);
            let (own_flags, rest_flags) = std::mem::take(&mut flags).split_at_mut(self.nt);
            slots = rest_slots;
            flags = rest_flags;
            rows.push(WorkerRows {
                worker,
                n_mom: self.n_mom,
                slots: own_slots,
                flags: own_flags,
            });
        }
        Ok(rows)
    }

    /// Union of every worker's flags.
    #[must_use]
    pub fn nonzero(&self) -> NonZeroFlags {
        let mut merged = NonZeroFlags::new(self.nt);
        for worker_flags in self.flags.chunks(self.nt.max(1)) {
            for (m, &f) in merged.0.iter_mut().zip(worker_flags) {
                *m |= f;
            }
        }
        merged
    }

    /// Fold every worker's flagged slices into `out` and zero them.
    ///
    /// Summation order is worker 0, 1, …, then t, then k, independent of
    /// how sites were scheduled. Unflagged time slices of `out` are left
    /// untouched. Returns the flags that were used; the pool is left
    /// all-zero and unflagged.
    pub fn reduce_into(
        &mut self,
        out: &mut MesonCorrelator,
        sites_on_node: usize,
        cost: &mut CostMeter,
    ) -> Result<NonZeroFlags, ContractError> {
        ContractError::check_len("correlator time slices", self.nt, out.nt())?;
        ContractError::check_len("correlator momenta", self.n_mom, out.n_mom())?;

        let nonzero = self.nonzero();
        for worker in 0..self.workers {
            for t in nonzero.slices() {
                let base = (worker * self.nt + t) * self.n_mom;
                let cells = &mut self.slots[base..base + self.n_mom];
                for (dst, cell) in out.row_mut(t).iter_mut().zip(cells.iter_mut()) {
                    *dst += *cell;
                    *cell = Complex64::ZERO;
                }
            }
        }
        self.flags.fill(false);

        cost.add_flops("reduction", reduction_flops(sites_on_node, self.n_mom));
        Ok(nonzero)
    }

    /// Whether every slot is exactly zero and no flag is set.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.slots.iter().all(|z| *z == Complex64::ZERO) && !self.flags.contains(&true)
    }

    /// Free all rows.
    pub fn release(self) {
        drop(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn acquire_zeroes_everything() {
        let pool = ThreadAccumulatorPool::acquire(3, 4, 2, 0).unwrap();
        assert_eq!(pool.workers(), 3);
        assert!(pool.is_clear());
        assert_eq!(pool.nonzero().count(), 0);
    }

    #[test]
    fn zero_workers_clamped_to_one() {
        let pool = ThreadAccumulatorPool::acquire(0, 4, 2, 0).unwrap();
        assert_eq!(pool.workers(), 1);
    }

    #[test]
    fn worker_rows_are_disjoint() {
        let mut pool = ThreadAccumulatorPool::acquire(2, 3, 2, 0).unwrap();
        {
            let mut rows = pool.worker_rows_mut().unwrap();
            assert_eq!(rows.len(), 2);
            rows[0].accumulate(1, Complex64::ONE, &[Complex64::ONE, Complex64::I]);
            rows[1].accumulate(2, Complex64::new(2.0, 0.0), &[Complex64::ONE, Complex64::ONE]);
        }
        assert_eq!(pool.slot(0, 1, 0), Complex64::ONE);
        assert_eq!(pool.slot(0, 1, 1), Complex64::I);
        assert_eq!(pool.slot(1, 2, 0), Complex64::new(2.0, 0.0));
        assert_eq!(pool.slot(1, 1, 0), Complex64::ZERO);
        let flags = pool.nonzero();
        assert_eq!(flags.slices().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(flags.as_slice(), &[false, true, true]);
        assert!(flags.is_set(2) && !flags.is_set(0));
    }

    #[test]
    fn overflowing_cell_count_is_allocation_error() {
        let err = ThreadAccumulatorPool::acquire(usize::MAX / 4, 4, 2, 6).unwrap_err();
        assert!(matches!(
            err,
            ContractError::Allocation {
                component: "accumulator_pool",
                node: 6,
                buffer: "thread accumulators",
            }
        ));
        let err = ThreadAccumulatorPool::acquire(1 << 62, 4, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            ContractError::Allocation {
                buffer: "nonzero flags",
                ..
            }
        ));
    }

    #[test]
    fn too_many_worker_views_is_allocation_error() {
        let mut pool = ThreadAccumulatorPool::acquire(usize::MAX / 2, 0, 3, 2).unwrap();
        let err = pool.worker_rows_mut().unwrap_err();
        assert!(matches!(
            err,
            ContractError::Allocation {
                buffer: "worker views",
                node: 2,
                ..
            }
        ));
    }

    #[test]
    fn reduce_sums_workers_and_clears_pool() {
        let mut pool = ThreadAccumulatorPool::acquire(3, 2, 1, 0).unwrap();
        {
            let mut rows = pool.worker_rows_mut().unwrap();
            for (w, row) in rows.iter_mut().enumerate() {
                row.accumulate(0, Complex64::new(w as f64 + 1.0, 0.0), &[Complex64::ONE]);
            }
        }
        let mut out = MesonCorrelator::zeros(2, 1);
        let mut cost = CostMeter::start();
        let flags = pool.reduce_into(&mut out, 10, &mut cost).unwrap();
        assert_eq!(out.get(0, 0), Complex64::new(6.0, 0.0));
        assert_eq!(flags.count(), 1);
        assert!(pool.is_clear());
        assert!((cost.flops() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unflagged_slices_left_untouched() {
        let mut pool = ThreadAccumulatorPool::acquire(1, 3, 1, 0).unwrap();
        pool.worker_rows_mut().unwrap()[0].accumulate(2, Complex64::ONE, &[Complex64::ONE]);
        let mut out = MesonCorrelator::zeros(3, 1);
        out.row_mut(0)[0] = Complex64::new(f64::NAN, 0.0);
        let mut cost = CostMeter::start();
        pool.reduce_into(&mut out, 1, &mut cost).unwrap();
        assert!(out.get(0, 0).re.is_nan(), "slice 0 must not be touched");
        assert_eq!(out.get(1, 0), Complex64::ZERO);
        assert_eq!(out.get(2, 0), Complex64::ONE);
    }

    #[test]
    fn reduce_rejects_wrong_output_shape() {
        let mut pool = ThreadAccumulatorPool::acquire(1, 4, 2, 0).unwrap();
        let mut out = MesonCorrelator::zeros(4, 3);
        let mut cost = CostMeter::start();
        let err = pool.reduce_into(&mut out, 1, &mut cost).unwrap_err();
        assert!(matches!(
            err,
            ContractError::ShapeMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn empty_momentum_pool_still_tracks_flags() {
        let mut pool = ThreadAccumulatorPool::acquire(2, 4, 0, 0).unwrap();
        pool.worker_rows_mut().unwrap()[1].accumulate(3, Complex64::ONE, &[]);
        assert_eq!(pool.nonzero().slices().collect::<Vec<_>>(), vec![3]);
        let mut out = MesonCorrelator::zeros(4, 0);
        let mut cost = CostMeter::start();
        pool.reduce_into(&mut out, 8, &mut cost).unwrap();
        assert!(pool.is_clear());
        assert!(cost.flops().abs() < f64::EPSILON);
    }
}
