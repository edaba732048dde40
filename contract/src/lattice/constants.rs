// SPDX-License-Identifier: AGPL-3.0-only

//! Lattice constants and the deterministic LCG used to fill test fields.

/// Number of colors in QCD (SU(3)); length of a staggered color vector.
pub const N_COLORS: usize = 3;

/// Number of spatial dimensions carrying a momentum component.
pub const N_SPATIAL: usize = 3;

/// LCG multiplier (Knuth MMIX).
pub const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;

/// LCG increment (Knuth MMIX).
pub const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;

/// Divisor for LCG → uniform [0, 1) conversion with 53 mantissa bits.
pub const LCG_53_DIVISOR: f64 = (1u64 << 53) as f64;

/// Advance the LCG state by one step.
#[inline]
pub fn lcg_step(seed: &mut u64) {
    *seed = seed
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT);
}

/// Generate a uniform f64 in [0, 1) from 53 bits of LCG state.
#[inline]
pub fn lcg_uniform_f64(seed: &mut u64) -> f64 {
    lcg_step(seed);
    (*seed >> 11) as f64 / LCG_53_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcg_step_deterministic() {
        let mut a = 42u64;
        let mut b = 42u64;
        lcg_step(&mut a);
        lcg_step(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn lcg_uniform_in_range() {
        let mut seed = 12345u64;
        for _ in 0..1000 {
            let v = lcg_uniform_f64(&mut seed);
            assert!((0.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn n_colors_is_three() {
        assert_eq!(N_COLORS, 3);
    }
}
