// SPDX-License-Identifier: AGPL-3.0-only

//! Meson contraction validation (CPU backend).
//!
//! # Validation targets
//!
//! | Property | Expected | Basis |
//! |----------|----------|-------|
//! | p = 0 correlator | Σ_x ⟨ψ̄\|ψ⟩ per slice | Fourier factor ≡ 1 |
//! | 1 vs K workers | identical | Fixed reduction order |
//! | Two calls | 2 × one call | Accumulate-into output |
//! | Time slab | only owned slices change | Non-zero flags |
//! | Slab sum | full-lattice result | Site partition |
//! | EVEN phase at x = L/4 | ≈ 0 | cos(π/2) |
//! | N = 0 | no-op, valid report | Empty momentum list |
//!
//! Usage: `validate_meson_contraction [--json <path>]`. Log level follows
//! `RUST_LOG`.

use hotspring_contract::lattice::complex_f64::Complex64;
use hotspring_contract::lattice::field::ColorField;
use hotspring_contract::lattice::geometry::{LocalGeometry, LocalLattice, TimeSlab};
use hotspring_contract::lattice::meson::{
    axis_factors, phase_factor, ContractArgs, ContractionBackend, CpuContraction,
    MesonCorrelator, MomentumRequest, Parity, PrecisionTags,
};
use hotspring_contract::tolerances;
use hotspring_contract::validation::ValidationHarness;
use hotspring_contract::ContractError;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DIMS: [usize; 4] = [4, 4, 4, 8];
const SEED: u64 = 42;

fn momenta() -> Vec<MomentumRequest> {
    vec![
        MomentumRequest::fourier([0, 0, 0]),
        MomentumRequest::fourier([1, 0, 0]),
        MomentumRequest::fourier([1, 1, 1]),
        MomentumRequest::new([1, 0, 0], [Parity::Even, Parity::EvenAndOdd, Parity::EvenAndOdd]),
        MomentumRequest::new([0, 2, 1], [Parity::Odd, Parity::Even, Parity::Odd]),
    ]
}

fn run(
    backend: &CpuContraction,
    args: &mut ContractArgs,
    geometry: &dyn LocalGeometry,
    anti: &ColorField,
    quark: &ColorField,
    out: &mut MesonCorrelator,
) -> Result<f64, ContractError> {
    let report = backend.contract(
        PrecisionTags::default(),
        args,
        geometry,
        &anti.data,
        &quark.data,
        out,
    )?;
    println!(
        "  {} workers={}: {:.3e} flops in {:.3e} s ({:.3} GFLOP/s)",
        backend.name(),
        backend.workers(),
        report.flops,
        report.dtime,
        report.gflops()
    );
    Ok(report.flops)
}

/// Restrict a full-lattice field to the sites a time slab owns.
fn slab_field(full: &ColorField, lat: &LocalLattice, slab: &TimeSlab) -> ColorField {
    ColorField {
        data: (0..slab.sites_on_node())
            .map(|i| full.data[lat.site_index(slab.coords(i))])
            .collect(),
    }
}

fn parse_json_flag() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--json" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

fn validate(harness: &mut ValidationHarness) -> Result<(), ContractError> {
    let lat = LocalLattice::new(DIMS);
    let nt = DIMS[3];
    let anti = ColorField::random(lat.volume(), SEED);
    let quark = ColorField::random(lat.volume(), SEED + 1);
    let r0 = [1, 0, 2];
    let n_mom = momenta().len();
    let many = rayon::current_num_threads().max(4);

    println!("═══ Zero Momentum ═══");
    {
        let mut args = ContractArgs::new(vec![MomentumRequest::fourier([0, 0, 0])], r0);
        let mut out = MesonCorrelator::zeros(nt, 1);
        run(&CpuContraction::with_workers(many), &mut args, &lat, &anti, &quark, &mut out)?;
        let mut direct = MesonCorrelator::zeros(nt, 1);
        for (i, d) in anti.site_dots(&quark).into_iter().enumerate() {
            direct.row_mut(lat.site_coords(i)[3])[0] += d;
        }
        harness.check_correlators(
            "p=0 equals per-slice sum",
            &out,
            &direct,
            tolerances::ZERO_MOMENTUM_SUM_ABS,
        );
    }
    println!();

    println!("═══ Worker Count Invariance ═══");
    let reference = {
        let mut args = ContractArgs::new(momenta(), r0);
        let mut serial = MesonCorrelator::zeros(nt, n_mom);
        run(&CpuContraction::with_workers(1), &mut args, &lat, &anti, &quark, &mut serial)?;
        let mut parallel = MesonCorrelator::zeros(nt, n_mom);
        run(&CpuContraction::with_workers(many), &mut args, &lat, &anti, &quark, &mut parallel)?;
        harness.check_correlators(
            "1 vs K workers",
            &parallel,
            &serial,
            tolerances::CONTRACTION_WORKER_PARITY,
        );

        let mut again = MesonCorrelator::zeros(nt, n_mom);
        run(&CpuContraction::with_workers(many), &mut args, &lat, &anti, &quark, &mut again)?;
        harness.check_bool("K workers bitwise reproducible", again == parallel);
        serial
    };
    println!();

    println!("═══ Accumulate Into Output ═══");
    {
        let backend = CpuContraction::with_workers(many);
        let mut args = ContractArgs::new(momenta(), r0);
        let mut twice = MesonCorrelator::zeros(nt, n_mom);
        run(&backend, &mut args, &lat, &anti, &quark, &mut twice)?;
        run(&backend, &mut args, &lat, &anti, &quark, &mut twice)?;
        let doubled = MesonCorrelator::from_rows(
            &reference
                .to_rows()
                .into_iter()
                .map(|row| row.into_iter().map(|z| z.scale(2.0)).collect())
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|| MesonCorrelator::zeros(0, 0));
        let scale = reference.max_abs().max(1.0);
        harness.check_correlators(
            "two calls double output",
            &twice,
            &doubled,
            tolerances::CONTRACTION_REPEAT_REL * scale,
        );
    }
    println!();

    println!("═══ Partial Time Coverage ═══");
    {
        let slabs = TimeSlab::partition(DIMS, 3);
        let sentinel = Complex64::new(-1.0e3, 7.0);
        let mut summed = MesonCorrelator::zeros(nt, n_mom);
        for slab in &slabs {
            let a = slab_field(&anti, &lat, slab);
            let q = slab_field(&quark, &lat, slab);
            let mut args = ContractArgs::new(momenta(), r0);

            let mut marked = MesonCorrelator::from_rows(&vec![vec![sentinel; n_mom]; nt])
                .unwrap_or_else(|| MesonCorrelator::zeros(0, 0));
            run(&CpuContraction::with_workers(2), &mut args, slab, &a, &q, &mut marked)?;
            let owned = slab.time_range();
            let untouched_ok = (0..nt)
                .filter(|t| !owned.contains(t))
                .all(|t| marked.row(t).iter().all(|&z| z == sentinel));
            harness.check_bool(
                &format!("node {} leaves foreign slices", slab.node),
                untouched_ok,
            );

            run(&CpuContraction::with_workers(2), &mut args, slab, &a, &q, &mut summed)?;
        }
        harness.check_correlators(
            "slab sum equals full lattice",
            &summed,
            &reference,
            tolerances::NODE_SPLIT_PARITY,
        );
    }
    println!();

    println!("═══ Boundary Phase ═══");
    {
        let l = DIMS[0];
        let z = phase_factor(
            axis_factors(DIMS),
            [l / 4, 0, 0, 0],
            [0, 0, 0],
            [1, 0, 0],
            [Parity::Even, Parity::EvenAndOdd, Parity::EvenAndOdd],
        );
        println!("  φ(L/4, 0, 0) = {z}");
        harness.check_upper("EVEN phase at L/4", z.abs(), tolerances::PHASE_NODE_ABS);
    }
    println!();

    println!("═══ Empty Momentum List ═══");
    {
        let mut args = ContractArgs::new(Vec::new(), r0);
        let mut out = MesonCorrelator::zeros(nt, 0);
        let flops = run(&CpuContraction::with_workers(many), &mut args, &lat, &anti, &quark, &mut out)?;
        harness.check_abs("N=0 flops", flops, 0.0, tolerances::EXACT_F64);
        harness.check_bool("N=0 output unchanged", out == MesonCorrelator::zeros(nt, 0));
        harness.check_bool("N=0 dtime recorded", args.dtime >= 0.0);
    }
    println!();

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let json = parse_json_flag();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Meson Contraction Validation (CPU)                         ║");
    println!("║  C(t, p) = Σ_x φ_p(x) ⟨ψ̄(x)|ψ(x)⟩  on 4³×8                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut harness = ValidationHarness::new("meson_contraction");
    let t_start = Instant::now();

    if let Err(e) = validate(&mut harness) {
        tracing::error!(%e, "contraction failed");
        harness.check_bool(&format!("contraction error: {e}"), false);
    }

    println!("  Wall time: {:.3} s", t_start.elapsed().as_secs_f64());
    harness.finish(json.as_deref());
}
