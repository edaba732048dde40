// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for the contraction binaries.
//!
//! A validation run collects named checks against documented tolerances
//! (see [`crate::tolerances`]), prints a summary, optionally writes it as
//! JSON, and exits 0 when every check passed and 1 otherwise.

use serde::Serialize;
use std::path::Path;
use std::process;

use crate::error::ContractError;
use crate::lattice::meson::MesonCorrelator;

/// How a tolerance threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// |observed − expected| < tolerance
    Absolute,
    /// |observed − expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
    /// observed > threshold
    LowerBound,
}

impl std::fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::LowerBound => write!(f, ">"),
        }
    }
}

/// One recorded check.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub label: String,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub tolerance: f64,
    pub mode: ToleranceMode,
}

/// Machine-readable summary of a run.
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub name: &'a str,
    pub passed: usize,
    pub total: usize,
    pub checks: &'a [Check],
}

/// Accumulates checks for one validation binary.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: ToleranceMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    /// |observed − expected| < tolerance
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Absolute);
    }

    /// |observed − expected| / |expected| < tolerance, falling back to
    /// |observed| < tolerance when expected is zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > f64::EPSILON {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(label, passed, observed, expected, tolerance, ToleranceMode::Relative);
    }

    /// observed < threshold
    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::UpperBound,
        );
    }

    /// observed > threshold
    pub fn check_lower(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed > threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::LowerBound,
        );
    }

    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            ToleranceMode::Absolute,
        );
    }

    /// Largest component difference between two correlators below `tolerance`.
    ///
    /// Shape disagreement fails the check outright.
    pub fn check_correlators(
        &mut self,
        label: &str,
        observed: &MesonCorrelator,
        expected: &MesonCorrelator,
        tolerance: f64,
    ) {
        let same_shape = observed.nt() == expected.nt() && observed.n_mom() == expected.n_mom();
        let diff = if same_shape {
            observed.max_abs_diff(expected)
        } else {
            f64::INFINITY
        };
        self.push(label, diff < tolerance, diff, 0.0, tolerance, ToleranceMode::Absolute);
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    #[must_use]
    pub fn report(&self) -> ValidationReport<'_> {
        ValidationReport {
            name: &self.name,
            passed: self.passed_count(),
            total: self.total_count(),
            checks: &self.checks,
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ContractError> {
        let json = serde_json::to_string_pretty(&self.report())
            .map_err(|e| ContractError::ReportWrite(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ContractError::ReportWrite(format!("{}: {e}", path.display())))
    }

    /// Human-readable summary.
    #[must_use]
    pub fn format_summary(&self) -> String {
        use std::fmt::Write;
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print the summary, write the JSON report if asked, and exit.
    ///
    /// Exit 0 if all checks pass, exit 1 if any fails or the report
    /// cannot be written.
    pub fn finish(&self, json: Option<&Path>) -> ! {
        println!();
        print!("{}", self.format_summary());

        if let Some(path) = json {
            if let Err(e) = self.write_json(path) {
                tracing::error!(%e, "validation report not written");
                process::exit(1);
            }
        }

        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        }
        let failed: Vec<&str> = self
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect();
        println!("FAILED CHECKS: {}", failed.join(", "));
        process::exit(1);
    }
}
