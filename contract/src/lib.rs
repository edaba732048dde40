// SPDX-License-Identifier: AGPL-3.0-only

#![deny(clippy::expect_used, clippy::unwrap_used)]

//! hotSpring Contract: CPU reference meson contraction.
//!
//! Computes the momentum-projected staggered two-point correlator
//!
//!   C(t, p) = Σ_{x⃗} φ_p(x⃗ - r⃗₀) ⟨ψ̄(x⃗,t) | ψ(x⃗,t)⟩
//!
//! from two color-vector propagator fields. The call contract matches the
//! accelerator-offloaded contraction (same inputs, same accumulate-into
//! output, same cost report), so either backend can be swapped in.
//!
//! ## Active modules
//!   - `lattice`: complex scalars, local geometry, color fields, and the
//!     `meson` contraction pipeline (phases → thread accumulators → kernel →
//!     reduction → cost report)
//!   - `error`: typed contraction errors and the terminal-error policy
//!   - `tolerances`: documented validation thresholds
//!   - `validation`: pass/fail harness shared by validation binaries
//!
//! ## Validation binaries
//!   - `validate_meson_contraction`: zero-momentum sum, worker-count parity,
//!     accumulate-into doubling, partial time coverage, phase node check,
//!     empty momentum list

pub mod error;
pub mod lattice;
pub mod tolerances;
pub mod validation;

pub use error::ContractError;
