//! # Worker - Managed Rendezvous Threads
//!
//! Each actor that needs independent blocking behavior (a Buffer's reader,
//! a ResourcePool's collector) runs one of these: an OS thread that is
//! registered with the director for its whole life, so the session always
//! knows exactly how many threads exist and how many are parked.
//!
//! Lifecycle per worker:
//!
//! ```text
//! Runnable ──(enters wait)──► Blocked(cause) ──(notified)──► Runnable
//!     │                                                         │
//!     └──(work done / Cancelled observed)──► deregister ──► Terminated
//! ```
//!
//! A worker observing [`Cancelled`](crate::RendezvousError::Cancelled)
//! mid-wait exits cleanly without completing its pending exchange. The
//! registration guard deregisters on every exit path, including unwinds.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::director::{Director, WorkerId};
use crate::error::{RendezvousError, RendezvousResult};

/// Deregisters the worker when the thread leaves, however it leaves.
struct Registration<T> {
    director: Arc<Director<T>>,
    id: WorkerId,
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        self.director.deregister_worker(self.id);
    }
}

/// A long-lived worker thread registered with a director session.
pub struct Worker {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawns a named worker thread.
    ///
    /// The thread registers itself before running `work` and deregisters on
    /// the way out. A `Cancelled` result is the normal shutdown path and is
    /// traced, not treated as a failure.
    pub fn spawn<T, F>(director: &Arc<Director<T>>, name: impl Into<String>, work: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce() -> RendezvousResult<()> + Send + 'static,
    {
        let name = name.into();
        let thread_name = name.clone();
        let director = Arc::clone(director);

        let handle = thread::spawn(move || {
            let _registration = Registration {
                id: director.register_worker(&thread_name),
                director: Arc::clone(&director),
            };
            match work() {
                Ok(()) => tracing::trace!(worker = %thread_name, "worker finished"),
                Err(RendezvousError::Cancelled) => {
                    tracing::trace!(worker = %thread_name, "worker cancelled, exiting cleanly");
                }
                Err(err) => {
                    tracing::error!(worker = %thread_name, %err, "worker failed");
                }
            }
        });

        Self { name, handle: Some(handle) }
    }

    /// The worker's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the worker thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the worker thread to exit. Call after the session's stop
    /// has been requested, otherwise this can wait forever.
    ///
    /// A worker that unwound from a panic is reported here; the panic is
    /// contained, not propagated into the joining thread.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(worker = %self.name, "worker thread panicked");
            }
        }
    }
}
