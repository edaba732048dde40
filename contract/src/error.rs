// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for the meson contraction.
//!
//! Every failure here is terminal for the contraction call: there is no
//! resumption point once the thread accumulators are populated. The library
//! returns these errors; [`terminate`] applies the process-level policy
//! (diagnostic, then exit) for callers that want the accelerator-parity
//! behavior.

use thiserror::Error;

/// Errors arising from a contraction call.
#[derive(Debug, Error)]
pub enum ContractError {
    /// A working buffer could not be reserved.
    #[error("{component}({node}): no room for {buffer}")]
    Allocation {
        /// Pipeline stage that requested the buffer.
        component: &'static str,
        /// Node (process) identity from the local geometry.
        node: usize,
        /// Buffer that could not be obtained.
        buffer: &'static str,
    },

    /// A parity tag outside {EVEN, ODD, EVENANDODD}.
    #[error("phase factor({node}): bad parity {value}")]
    BadParity {
        /// Node (process) identity from the local geometry.
        node: usize,
        /// The offending raw tag.
        value: u8,
    },

    /// An input slice whose length disagrees with the geometry or momenta.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which input was mis-sized.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// Reading or parsing a configuration record failed.
    #[error("configuration load failed: {0}")]
    ConfigLoad(String),

    /// Serializing or writing a validation report failed.
    #[error("validation report write failed: {0}")]
    ReportWrite(String),
}

impl ContractError {
    /// Check that `actual` matches `expected`, naming the input on failure.
    pub(crate) fn check_len(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

/// Report a fatal contraction error and terminate the process.
///
/// Matches the terminal policy of the accelerator interface: no partial
/// result is handed back, the diagnostic goes to the log, exit status 1.
pub fn terminate(err: &ContractError) -> ! {
    tracing::error!(error = %err, "meson contraction aborted");
    eprintln!("{err}");
    std::process::exit(1)
}
