//! Invocation-level errors
//!
//! Per-record failures never show up here; they become
//! [`ProcessingOutcome`](crate::outcome::ProcessingOutcome)s. Only problems
//! that leave nothing to iterate over fail the whole invocation.

use crate::config::ConfigError;

/// Sanitiser error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The notification payload could not be parsed as a batch
    #[error("malformed notification batch: {0}")]
    BatchMalformed(String),
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::BatchMalformed(e.to_string())
    }
}
