//! Error types for unit generation.

use thiserror::Error;

/// Result type alias for unit generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort rendering a unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Restart policy outside the set systemd understands
    #[error("{got:?} is not a valid restart policy (valid policies: {valid})")]
    InvalidRestartPolicy { got: String, valid: String },

    /// Captured create command cannot be rewritten
    #[error("malformed create command at {flag}: {reason}")]
    MalformedInvocation { flag: String, reason: String },
}

impl Error {
    pub(crate) fn malformed(flag: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedInvocation {
            flag: flag.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_value(flag: &str) -> Self {
        Self::malformed(flag, "flag needs an argument")
    }
}
