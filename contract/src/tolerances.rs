// SPDX-License-Identifier: AGPL-3.0-only

//! Validation tolerances for the meson contraction.
//!
//! Every threshold used by the validation binary and the test suites is
//! defined here together with where it comes from. No ad-hoc magic numbers.
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | exact phase identities |
//! | Summation order | reassociation of f64 adds | worker-count parity |
//! | Trigonometric nodes | `sin`/`cos` at multiples of π/2 | boundary phases |

// ═══════════════════════════════════════════════════════════════════
// Machine precision
// ═══════════════════════════════════════════════════════════════════

/// Results that must agree to within a few ULP.
///
/// Used where the same operations run in the same order, e.g. the phase
/// table against a direct `phase_factor` call.
pub const EXACT_F64: f64 = 1e-14;

/// Unit modulus of an `EVENANDODD` phase factor.
///
/// Three chained rotations each lose at most a couple of ULP in |z|².
pub const PHASE_UNIT_MODULUS: f64 = 1e-13;

// ═══════════════════════════════════════════════════════════════════
// Summation order
// ═══════════════════════════════════════════════════════════════════

/// Correlator agreement between different worker counts.
///
/// Changing the worker count changes which sites are summed together
/// before the reduction. Inputs are O(1) color vectors on O(10³) sites,
/// so reassociation error stays near 1e-14; 1e-12 leaves headroom for
/// larger test volumes.
pub const CONTRACTION_WORKER_PARITY: f64 = 1e-12;

/// Two identical calls into one correlator against twice one call.
///
/// The second call adds each worker's partial sum onto the first result
/// rather than forming the total first. Relative to max(|C|, 1).
pub const CONTRACTION_REPEAT_REL: f64 = 1e-12;

/// Zero-momentum correlator against the direct per-slice sum of inner
/// products.
///
/// The direct sum adds sites in lexicographic order; the contraction sums
/// per worker first. Same reassociation bound as worker parity.
pub const ZERO_MOMENTUM_SUM_ABS: f64 = 1e-12;

/// Sum of per-node time-slab contractions against one full-lattice call.
pub const NODE_SPLIT_PARITY: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// Trigonometric nodes
// ═══════════════════════════════════════════════════════════════════

/// Phase at a node of cos or sin, e.g. x − r0 = L/4 with p = 1 and EVEN.
///
/// `cos(π/2)` in f64 is 6.1e-17, not zero.
pub const PHASE_NODE_ABS: f64 = 1e-14;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerances_positive_and_ordered() {
        for tol in [
            EXACT_F64,
            PHASE_UNIT_MODULUS,
            CONTRACTION_WORKER_PARITY,
            CONTRACTION_REPEAT_REL,
            ZERO_MOMENTUM_SUM_ABS,
            NODE_SPLIT_PARITY,
            PHASE_NODE_ABS,
        ] {
            assert!(tol > 0.0 && tol < 1e-9, "tolerance {tol} out of range");
        }
        assert!(EXACT_F64 <= CONTRACTION_WORKER_PARITY);
    }

    #[test]
    fn phase_node_covers_f64_cosine_residual() {
        let residual = std::f64::consts::FRAC_PI_2.cos().abs();
        assert!(residual > 0.0);
        assert!(residual < PHASE_NODE_ABS);
    }
}
