// SPDX-License-Identifier: AGPL-3.0-only

//! The contraction configuration record.
//!
//! Mirrors the argument block of the accelerator contraction call: a list
//! of sink momenta with per-axis parity tags, the phase origin, and two
//! return slots (`flops`, `dtime`) written back after the call.
//!
//! Parity tags are stored as the raw interface codes (EVEN = 0x02,
//! ODD = 0x01, EVENANDODD = 0x03) so a malformed record survives loading
//! and is rejected by the phase builder with the offending value.
//!
//! JSON form:
//!
//! ```json
//! {
//!   "momenta": [
//!     { "momentum": [0, 0, 0], "parity": [3, 3, 3] },
//!     { "momentum": [1, 0, 0], "parity": [2, 3, 3] }
//!   ],
//!   "r0": [0, 0, 0]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::cost::CostReport;
use super::phase::Parity;
use crate::error::ContractError;

/// One requested sink momentum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentumRequest {
    /// Integer momentum (px, py, pz) in units of 2π/L per axis.
    pub momentum: [i32; 3],
    /// Raw parity code per spatial axis (x, y, z).
    pub parity: [u8; 3],
}

impl MomentumRequest {
    /// Momentum with typed parity tags.
    #[must_use]
    pub const fn new(momentum: [i32; 3], parity: [Parity; 3]) -> Self {
        Self {
            momentum,
            parity: [parity[0].code(), parity[1].code(), parity[2].code()],
        }
    }

    /// Plain Fourier component exp(i p⃗·x⃗) on every axis.
    #[must_use]
    pub const fn fourier(momentum: [i32; 3]) -> Self {
        Self::new(momentum, [Parity::EvenAndOdd; 3])
    }

    /// Decode the parity tags, rejecting unknown codes.
    pub fn parities(&self, node: usize) -> Result<[Parity; 3], ContractError> {
        Ok([
            Parity::from_code(self.parity[0], node)?,
            Parity::from_code(self.parity[1], node)?,
            Parity::from_code(self.parity[2], node)?,
        ])
    }
}

/// Floating-point precision tag of the accelerator interface.
///
/// The CPU path always computes in f64; the tags are accepted only so the
/// call signature matches an accelerator backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

/// Host-side and device-side precision tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionTags {
    pub host: Precision,
    pub device: Precision,
}

/// Contraction configuration record with cost return slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractArgs {
    /// Requested sink momenta; N = `momenta.len()`.
    pub momenta: Vec<MomentumRequest>,
    /// Coordinate origin for the Fourier phases.
    pub r0: [i32; 3],
    /// Return value: floating-point operations performed.
    #[serde(default)]
    pub flops: f64,
    /// Return value: wall-clock seconds.
    #[serde(default)]
    pub dtime: f64,
}

impl ContractArgs {
    #[must_use]
    pub fn new(momenta: Vec<MomentumRequest>, r0: [i32; 3]) -> Self {
        Self {
            momenta,
            r0,
            flops: 0.0,
            dtime: 0.0,
        }
    }

    /// Number of requested momenta.
    #[must_use]
    pub fn num_corr_mom(&self) -> usize {
        self.momenta.len()
    }

    /// Parse a record from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ContractError> {
        serde_json::from_str(json).map_err(|e| ContractError::ConfigLoad(e.to_string()))
    }

    /// Load a record from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContractError::ConfigLoad(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Write a cost report into the return slots.
    pub fn record_cost(&mut self, report: CostReport) {
        self.flops = report.flops;
        self.dtime = report.dtime;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_record() {
        let json = r#"{
            "momenta": [
                { "momentum": [0, 0, 0], "parity": [3, 3, 3] },
                { "momentum": [1, 0, -2], "parity": [2, 1, 3] }
            ],
            "r0": [1, 2, 3]
        }"#;
        let args = ContractArgs::from_json_str(json).unwrap();
        assert_eq!(args.num_corr_mom(), 2);
        assert_eq!(args.r0, [1, 2, 3]);
        assert_eq!(args.momenta[1].momentum, [1, 0, -2]);
        assert_eq!(
            args.momenta[1].parities(0).unwrap(),
            [Parity::Even, Parity::Odd, Parity::EvenAndOdd]
        );
        assert!(args.flops.abs() < f64::EPSILON);
        assert!(args.dtime.abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_parity_survives_loading() {
        let json = r#"{ "momenta": [{ "momentum": [1, 1, 1], "parity": [3, 9, 3] }], "r0": [0, 0, 0] }"#;
        let args = ContractArgs::from_json_str(json).unwrap();
        let err = args.momenta[0].parities(4).unwrap_err();
        assert!(matches!(
            err,
            ContractError::BadParity { node: 4, value: 9 }
        ));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = ContractArgs::from_json_str("{ \"momenta\": 3 }").unwrap_err();
        assert!(matches!(err, ContractError::ConfigLoad(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ContractArgs::load("/nonexistent/contract_args.json").unwrap_err();
        assert!(err.to_string().contains("contract_args.json"));
    }

    #[test]
    fn record_cost_overwrites_slots() {
        let mut args = ContractArgs::new(vec![MomentumRequest::fourier([0, 0, 0])], [0; 3]);
        args.record_cost(CostReport {
            flops: 128.0,
            dtime: 0.5,
        });
        assert!((args.flops - 128.0).abs() < f64::EPSILON);
        assert!((args.dtime - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn typed_constructor_encodes_codes() {
        let m = MomentumRequest::new([0, 1, 0], [Parity::Odd, Parity::Even, Parity::EvenAndOdd]);
        assert_eq!(m.parity, [0x01, 0x02, 0x03]);
    }

    #[test]
    fn precision_defaults_to_double() {
        let tags = PrecisionTags::default();
        assert_eq!(tags.host, Precision::Double);
        assert_eq!(tags.device, Precision::Double);
    }
}
