//! # Barrier - N-way Simultaneous Readiness
//!
//! One multiport input, no output. A fire completes only when *every*
//! connected channel holds a token, and drains them all in one critical
//! section: no single sender proceeds past the rendezvous point until every
//! other sender is also ready.

use std::sync::Arc;

use conclave_core::{Director, Receiver};

use crate::error::{ActorError, ActorResult};

/// Classic N-way barrier over the director's `get_from_all` primitive.
pub struct Barrier<T> {
    director: Arc<Director<T>>,
    inputs: Vec<Receiver<T>>,
}

impl<T> Barrier<T> {
    /// Creates a barrier with no channels connected yet.
    #[must_use]
    pub fn new(director: &Arc<Director<T>>) -> Self {
        Self { director: Arc::clone(director), inputs: Vec::new() }
    }

    /// Connects one more input channel and returns the sender's handle.
    pub fn connect(&mut self) -> Receiver<T> {
        let rx = self
            .director
            .channel(format!("barrier.input[{}]", self.inputs.len()));
        self.inputs.push(rx.clone());
        rx
    }

    /// Number of connected input channels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.inputs.len()
    }

    /// Blocks until every connected channel has delivered a token, then
    /// returns all of them (drained in connection order).
    ///
    /// Zero connected channels is a configuration error: there is nothing
    /// to barrier on.
    pub fn fire(&self) -> ActorResult<Vec<T>> {
        if self.inputs.is_empty() {
            return Err(ActorError::NoConnectedChannels);
        }
        Ok(self.director.get_from_all(&self.inputs)?)
    }
}
