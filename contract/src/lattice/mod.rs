// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice field theory primitives for the meson contraction.
//!
//! The contraction itself lives in [`meson`]; the other modules are the
//! collaborators it consumes: complex scalars, the local site geometry,
//! and staggered color-vector fields.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `complex_f64` | Complex f64 arithmetic |
//! | `constants` | LCG PRNG and color constants |
//! | `geometry` | Local site enumeration (full lattice or time slab) |
//! | `field` | Staggered color-vector fields and the site inner product |
//! | `meson` | Momentum-projected meson correlator |
//!
//! # References
//!
//! - Gattringer & Lang, "Quantum Chromodynamics on the Lattice" (2010), Ch. 6
//! - MILC Collaboration, `ks_meson_mom` momentum-projected correlators

/// Complex f64 arithmetic (re, im).
pub mod complex_f64;
/// LCG PRNG and lattice constants.
pub mod constants;
/// Staggered color-vector fields.
pub mod field;
/// Local lattice geometry: site coordinates and node identity.
pub mod geometry;
/// Momentum-projected meson contraction.
pub mod meson;
