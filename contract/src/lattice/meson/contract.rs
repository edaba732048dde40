// SPDX-License-Identifier: AGPL-3.0-only

//! The contraction call contract.
//!
//! `ContractionBackend` is the seam an accelerator backend plugs into: same
//! inputs, same accumulate-into output, same cost report written back into
//! [`ContractArgs`]. [`CpuContraction`] is the reference implementation.
//!
//! All inputs are validated before the output correlator is touched, so a
//! failed call leaves the caller's correlator exactly as it was.

use tracing::debug;

use super::accumulator::ThreadAccumulatorPool;
use super::args::{ContractArgs, PrecisionTags};
use super::correlator::MesonCorrelator;
use super::cost::{CostMeter, CostReport};
use super::kernel;
use super::phase::PhaseTable;
use crate::error::{terminate, ContractError};
use crate::lattice::field::ColorVector;
use crate::lattice::geometry::LocalGeometry;

/// A meson contraction implementation.
pub trait ContractionBackend {
    /// Short backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Add the momentum-projected correlator of `antiquark`/`quark` into `out`
    /// and write the cost into `args.flops` / `args.dtime`.
    fn contract(
        &self,
        precision: PrecisionTags,
        args: &mut ContractArgs,
        geometry: &dyn LocalGeometry,
        antiquark: &[ColorVector],
        quark: &[ColorVector],
        out: &mut MesonCorrelator,
    ) -> Result<CostReport, ContractError>;
}

/// CPU reference backend on the Rayon pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuContraction {
    workers: usize,
}

impl Default for CpuContraction {
    fn default() -> Self {
        Self::with_workers(rayon::current_num_threads())
    }
}

impl CpuContraction {
    /// Fix the worker count; 0 means no concurrency and becomes 1.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }
}

impl ContractionBackend for CpuContraction {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn contract(
        &self,
        precision: PrecisionTags,
        args: &mut ContractArgs,
        geometry: &dyn LocalGeometry,
        antiquark: &[ColorVector],
        quark: &[ColorVector],
        out: &mut MesonCorrelator,
    ) -> Result<CostReport, ContractError> {
        let mut cost = CostMeter::start();

        let node = geometry.node();
        let nt = geometry.nt();
        let sites = geometry.sites_on_node();
        let n_mom = args.num_corr_mom();
        debug!(
            backend = self.name(),
            node,
            sites,
            nt,
            n_mom,
            workers = self.workers,
            ?precision,
            "meson contraction"
        );

        ContractError::check_len("antiquark field", sites, antiquark.len())?;
        ContractError::check_len("quark field", sites, quark.len())?;
        ContractError::check_len("correlator time slices", nt, out.nt())?;
        ContractError::check_len("correlator momenta", n_mom, out.n_mom())?;

        let (pool, phases) = rayon::join(
            || ThreadAccumulatorPool::acquire(self.workers, nt, n_mom, node),
            || PhaseTable::build(geometry, &args.momenta, args.r0),
        );
        let mut pool = pool?;
        let phases = phases?;
        cost.add_flops("phase_table", phases.build_flops());

        kernel::accumulate(geometry, antiquark, quark, &phases, &mut pool, &mut cost)?;
        let nonzero = pool.reduce_into(out, sites, &mut cost)?;

        phases.release();
        pool.release();

        let report = cost.finish();
        args.record_cost(report);
        debug!(
            node,
            slices = nonzero.count(),
            flops = report.flops,
            seconds = report.dtime,
            "meson contraction done"
        );
        Ok(report)
    }
}

/// Contract on the default CPU backend.
pub fn contract(
    precision: PrecisionTags,
    args: &mut ContractArgs,
    geometry: &dyn LocalGeometry,
    antiquark: &[ColorVector],
    quark: &[ColorVector],
    out: &mut MesonCorrelator,
) -> Result<CostReport, ContractError> {
    CpuContraction::default().contract(precision, args, geometry, antiquark, quark, out)
}

/// Contract on the default CPU backend; any error terminates the process.
pub fn contract_or_terminate(
    precision: PrecisionTags,
    args: &mut ContractArgs,
    geometry: &dyn LocalGeometry,
    antiquark: &[ColorVector],
    quark: &[ColorVector],
    out: &mut MesonCorrelator,
) -> CostReport {
    match contract(precision, args, geometry, antiquark, quark, out) {
        Ok(report) => report,
        Err(e) => terminate(&e),
    }
}
