//! # ResourcePool - Grant/Release Token Pool
//!
//! Multiport `release` input, multiport `grant` output, plus an initial
//! pool of tokens. A dedicated collector thread is always willing to accept
//! a release on any channel and appends it to the pool; the firing side
//! grants only while the pool is non-empty, delivering the head to the
//! first grant channel with a parked claimant (a free slot nobody is
//! getting on receives a grant only when no claimant waits anywhere).
//!
//! ```text
//!  holders ──put──► [release slots] ──collector──► ┌──────────┐
//!                                                  │   pool   │
//!  claimants ◄──get── [grant slots] ◄────fire───── └──────────┘
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use conclave_core::{BlockCause, Director, Receiver, Worker};
use parking_lot::Mutex;

use crate::error::{ActorError, ActorResult};

/// Pool actor with a background collector thread.
pub struct ResourcePool<T> {
    director: Arc<Director<T>>,
    releases: Vec<Receiver<T>>,
    grants: Vec<Receiver<T>>,
    pool: Arc<Mutex<VecDeque<T>>>,
    collector: Option<Worker>,
}

impl<T: Send + 'static> ResourcePool<T> {
    /// Creates a pool seeded from the configured token list.
    #[must_use]
    pub fn new(director: &Arc<Director<T>>, initial: impl IntoIterator<Item = T>) -> Self {
        Self {
            director: Arc::clone(director),
            releases: Vec::new(),
            grants: Vec::new(),
            pool: Arc::new(Mutex::new(initial.into_iter().collect())),
            collector: None,
        }
    }

    /// Connects one more release channel and returns the holder's handle.
    pub fn connect_release(&mut self) -> Receiver<T> {
        let rx = self
            .director
            .channel(format!("pool.release[{}]", self.releases.len()));
        self.releases.push(rx.clone());
        rx
    }

    /// Connects one more grant channel and returns the claimant's handle.
    pub fn connect_grant(&mut self) -> Receiver<T> {
        let rx = self
            .director
            .channel(format!("pool.grant[{}]", self.grants.len()));
        self.grants.push(rx.clone());
        rx
    }

    /// Number of tokens currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.pool.lock().len()
    }

    /// Clears and repopulates the pool (a configuration change). Happens
    /// under the director's lock so every blocked participant observes the
    /// new pool atomically.
    pub fn set_pool(&self, tokens: impl IntoIterator<Item = T>) {
        self.director.run_locked(|| {
            let mut pool = self.pool.lock();
            pool.clear();
            pool.extend(tokens);
        });
        tracing::debug!("resource pool repopulated");
    }

    /// Starts the background collector thread.
    ///
    /// The collector continuously receives from whichever release channel
    /// is ready first and appends to the pool; it exits cleanly when the
    /// session stop is requested. At least one release channel must be
    /// connected before starting.
    pub fn start(&mut self) -> ActorResult<()> {
        if self.collector.is_some() {
            return Err(ActorError::AlreadyStarted);
        }
        if self.releases.is_empty() {
            return Err(ActorError::NoConnectedChannels);
        }
        let director = Arc::clone(&self.director);
        let releases = self.releases.clone();
        let pool = Arc::clone(&self.pool);
        self.collector = Some(Worker::spawn(&self.director, "pool.collector", move || {
            loop {
                let token = director.get_from_any(&releases)?;
                director.run_locked(|| pool.lock().push_back(token));
            }
        }));
        Ok(())
    }

    /// Blocks while the pool is empty, then grants the head token to a
    /// waiting claimant (the first grant channel with a parked getter).
    pub fn fire(&self) -> ActorResult<()> {
        if self.grants.is_empty() {
            return Err(ActorError::NoConnectedChannels);
        }
        loop {
            self.director
                .wait_until(BlockCause::Condition, || !self.pool.lock().is_empty())?;
            let head = self.director.run_locked(|| self.pool.lock().pop_front());
            // Lost the head to a concurrent fire; re-check emptiness.
            if let Some(token) = head {
                self.director.put_to_any(token, &self.grants)?;
                return Ok(());
            }
        }
    }

    /// Waits for the collector thread to exit. Request the session stop
    /// first.
    pub fn join(&mut self) {
        if let Some(collector) = &mut self.collector {
            collector.join();
        }
    }
}
