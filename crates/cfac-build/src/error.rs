//! Error types for build orchestration

use crate::phase::Phase;
use thiserror::Error;

/// Errors that can terminate a build run
#[derive(Error, Debug)]
pub enum BuildError {
    /// `--agree-cpc` was given something other than `yes`
    #[error("--agree-cpc should be yes. Given: {0}")]
    InvalidOption(String),

    /// A strict sub-command exited non-zero
    #[error("{phase} failed at `{command}` (exit status {exit_status})")]
    PhaseFailed {
        phase: Phase,
        command: String,
        exit_status: i32,
    },

    /// The external program could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for build operations
pub type Result<T> = std::result::Result<T, BuildError>;
