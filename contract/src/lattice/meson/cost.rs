// SPDX-License-Identifier: AGPL-3.0-only

//! Flop and wall-clock accounting for one contraction call.
//!
//! Flop counts follow the accelerator interface convention so CPU and
//! accelerator reports are comparable:
//!
//! | Stage | Flops |
//! |-------|-------|
//! | phase table | 18 × sites × N |
//! | kernel (complex multiply-add) | 8 × sites × N |
//! | reduction (upper bound) | 8 × sites × N |

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Real operations to compose one phase factor (three axis steps).
pub const FLOPS_PER_PHASE: f64 = 18.0;

/// Real operations in one complex multiply-accumulate.
pub const FLOPS_PER_CMADD: f64 = 8.0;

/// Phase-table cost for `sites` sites and `n_mom` momenta.
#[must_use]
pub fn phase_table_flops(sites: usize, n_mom: usize) -> f64 {
    sites as f64 * FLOPS_PER_PHASE * n_mom as f64
}

/// Kernel cost for `sites` sites and `n_mom` momenta.
#[must_use]
pub fn kernel_flops(sites: usize, n_mom: usize) -> f64 {
    n_mom as f64 * FLOPS_PER_CMADD * sites as f64
}

/// Reduction cost, reported as the same conservative bound as the kernel.
#[must_use]
pub fn reduction_flops(sites: usize, n_mom: usize) -> f64 {
    sites as f64 * FLOPS_PER_CMADD * n_mom as f64
}

/// Cost of one contraction call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    /// Floating-point operations.
    pub flops: f64,
    /// Wall-clock seconds.
    pub dtime: f64,
}

impl CostReport {
    /// Throughput in GFLOP/s (0 when no time elapsed).
    #[must_use]
    pub fn gflops(&self) -> f64 {
        if self.dtime > 0.0 {
            self.flops / self.dtime * 1e-9
        } else {
            0.0
        }
    }
}

/// Running tally started at call entry.
#[derive(Debug)]
pub struct CostMeter {
    start: Instant,
    flops: f64,
}

impl CostMeter {
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            flops: 0.0,
        }
    }

    /// Add the flops of one stage.
    pub fn add_flops(&mut self, stage: &'static str, flops: f64) {
        tracing::trace!(stage, flops, "contraction stage cost");
        self.flops += flops;
    }

    #[must_use]
    pub const fn flops(&self) -> f64 {
        self.flops
    }

    /// Stop the clock and produce the report.
    #[must_use]
    pub fn finish(self) -> CostReport {
        CostReport {
            flops: self.flops,
            dtime: self.start.elapsed().as_secs_f64(),
        }
    }
}
