//! Error types for session orchestration.

use stride_core::{RecordingStatus, ValidationError};
use thiserror::Error;

/// Failures talking to a running recording session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The driver task has exited; no further input is accepted.
    #[error("recording session has shut down")]
    Closed,

    /// A previous recording can only be continued from an inactive session.
    #[error("cannot continue a previous recording while {status}")]
    Busy { status: RecordingStatus },
}

/// Failures of a completion action.
///
/// A failed action does not count as the one action a handler may take.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The originating session no longer exists.
    #[error("the originating recording session no longer exists")]
    SessionGone,

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The snapshot sink refused the snapshot.
    #[error("failed to save snapshot")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[source] Box<figment::Error>),

    #[error("invalid configuration")]
    Invalid(#[from] ValidationError),
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Load(Box::new(error))
    }
}
