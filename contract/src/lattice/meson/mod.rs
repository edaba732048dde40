// SPDX-License-Identifier: AGPL-3.0-only

//! Momentum-projected meson contraction (CPU reference backend).
//!
//! Given an antiquark and a quark staggered propagator column, accumulates
//!
//!   C(t, p) += Σ_{x⃗} φ_p(x⃗ - r⃗₀) ⟨ψ̄(x⃗,t) | ψ(x⃗,t)⟩
//!
//! into a caller-owned correlator. This is a "dumb" Fourier transform: the
//! number of requested momenta is usually small, so a dense phase table
//! beats an FFT.
//!
//! # Pipeline
//!
//! ```text
//!   ┌──────────────┐   ┌────────────────────────┐
//!   │  PhaseTable  │   │ ThreadAccumulatorPool  │   built concurrently
//!   └──────┬───────┘   └───────────┬────────────┘
//!          └───────────┬───────────┘
//!               ┌──────▼──────┐
//!               │   kernel    │   parallel over sites, one row block per worker
//!               └──────┬──────┘
//!               ┌──────▼──────┐
//!               │  reduction  │   serial, fixed worker order → output
//!               └──────┬──────┘
//!               ┌──────▼──────┐
//!               │ CostReport  │   flops + wall seconds → ContractArgs
//!               └─────────────┘
//! ```
//!
//! Workers never share accumulator cells, so the hot loop takes no locks.
//! The reduction sums worker blocks in index order, which makes the result
//! reproducible for a given worker count.

/// Configuration record: momenta, parity tags, phase origin, cost slots.
pub mod args;
/// Per-worker, per-time-slice accumulators and the serial reduction.
pub mod accumulator;
/// Call contract and the backend seam shared with accelerator backends.
pub mod contract;
/// Caller-owned (time × momentum) correlator.
pub mod correlator;
/// Flop and wall-clock accounting.
pub mod cost;
/// Parallel contraction hot loop.
pub mod kernel;
/// Fourier phase table and parity-directed phase composition.
pub mod phase;

pub use accumulator::{NonZeroFlags, ThreadAccumulatorPool};
pub use args::{ContractArgs, MomentumRequest, Precision, PrecisionTags};
pub use contract::{contract, contract_or_terminate, ContractionBackend, CpuContraction};
pub use correlator::MesonCorrelator;
pub use cost::{CostMeter, CostReport};
pub use kernel::site_partition;
pub use phase::{axis_factors, phase_factor, Parity, PhaseTable};

use crate::error::ContractError;

/// Reserve and fill a working buffer of `extents.iter().product()` cells,
/// reporting failure instead of aborting.
///
/// The length is formed with checked multiplication; a product that does
/// not fit in `usize` is the same allocation failure as a refused reserve.
pub(crate) fn zeroed_buffer<T: Clone>(
    extents: &[usize],
    fill: T,
    component: &'static str,
    node: usize,
    buffer: &'static str,
) -> Result<Vec<T>, ContractError> {
    let no_room = || ContractError::Allocation {
        component,
        node,
        buffer,
    };
    let len = if extents.contains(&0) {
        0
    } else {
        extents
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(no_room)?
    };
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|_| no_room())?;
    v.resize(len, fill);
    Ok(v)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_buffer_fills() {
        let v = zeroed_buffer(&[5], 0u8, "test", 0, "bytes");
        assert!(matches!(v.as_deref(), Ok([0, 0, 0, 0, 0])));
    }

    #[test]
    fn zeroed_buffer_reports_capacity_overflow() {
        let err = zeroed_buffer(&[usize::MAX], 0u64, "phase_table", 2, "Fourier phases");
        match err {
            Err(ContractError::Allocation {
                component, node, ..
            }) => {
                assert_eq!(component, "phase_table");
                assert_eq!(node, 2);
            }
            other => panic!("expected allocation error, got {other:?}"),
        }
    }

    #[test]
    fn zeroed_buffer_reports_wrapping_product() {
        let err = zeroed_buffer(&[usize::MAX / 4, 4, 2], 0u8, "accumulator_pool", 1, "slots");
        assert!(matches!(
            err,
            Err(ContractError::Allocation {
                component: "accumulator_pool",
                node: 1,
                ..
            })
        ));
    }

    #[test]
    fn zeroed_buffer_multiplies_extents() {
        let v = zeroed_buffer(&[2, 3, 4], 1u8, "test", 0, "bytes").unwrap();
        assert_eq!(v.len(), 24);
        assert!(zeroed_buffer(&[7, 0], 1u8, "test", 0, "bytes").unwrap().is_empty());
        assert!(zeroed_buffer(&[usize::MAX, 2, 0], 1u8, "test", 0, "bytes")
            .unwrap()
            .is_empty());
    }
}
