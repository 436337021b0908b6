//! # Rendezvous Error Types
//!
//! All failure conditions of the rendezvous core.
//!
//! `Cancelled` is not a bug: it is the normal cooperative-shutdown path and
//! every blocked primitive reports it instead of retrying.

use thiserror::Error;

/// Errors that can occur during a rendezvous.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RendezvousError {
    /// The director's stop flag was set while this operation was pending.
    ///
    /// Callers must treat this as "stop working", never as a retryable
    /// failure. Worker threads catch it at their outermost loop and exit.
    #[error("rendezvous cancelled: session stop requested")]
    Cancelled,

    /// A multiway primitive was invoked over zero receivers.
    ///
    /// Such a call could never complete (there is nothing to wait for), so
    /// it is rejected immediately instead of blocking forever.
    #[error("rendezvous over an empty receiver set")]
    EmptyReceiverSet,

    /// A receiver handle belongs to a different director session.
    ///
    /// Every receiver in a multiway operation must share the caller's
    /// monitor, otherwise the exchange could not be atomic.
    #[error("receiver belongs to a different director session")]
    ForeignReceiver,
}

/// Result type for rendezvous operations.
pub type RendezvousResult<T> = Result<T, RendezvousError>;
