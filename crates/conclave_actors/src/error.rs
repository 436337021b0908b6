//! # Actor Error Types
//!
//! Configuration errors are fatal and non-retryable; cancellation bubbles
//! up from the core unchanged and means "stop working".

use conclave_core::RendezvousError;
use thiserror::Error;

/// Errors that can occur in a coordination actor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// A rendezvous primitive failed; `Cancelled` is the shutdown path.
    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),

    /// The actor was fired with zero connected channels on a port that
    /// requires at least one (nothing to rendezvous on).
    #[error("fired with no connected channels")]
    NoConnectedChannels,

    /// The actor's background worker was started twice.
    #[error("worker thread already started")]
    AlreadyStarted,

    /// The stage configuration is malformed or inconsistent.
    #[error("invalid stage configuration: {0}")]
    InvalidConfig(String),
}

impl ActorError {
    /// True when this error is the cooperative-shutdown signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Rendezvous(RendezvousError::Cancelled))
    }
}

/// Result type for coordination actors.
pub type ActorResult<T> = Result<T, ActorError>;
