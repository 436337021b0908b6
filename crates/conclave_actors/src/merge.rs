//! # Merge - First-Ready Forwarding
//!
//! Multiport input, single output. A fire receives from whichever input is
//! ready first and rendezvous-forwards it to the output as one atomic step.
//!
//! Contrast with Buffer/ResourcePool: Merge does **no** buffering. It is
//! only willing to accept a new input after the previous token has been
//! fully handed off to the output.

use std::sync::Arc;

use conclave_core::{Director, Receiver};

use crate::error::{ActorError, ActorResult};

/// Non-buffering merge over `get_from_any_put_to_all`.
pub struct Merge<T> {
    director: Arc<Director<T>>,
    inputs: Vec<Receiver<T>>,
    outputs: Vec<Receiver<T>>,
}

impl<T> Merge<T> {
    /// Creates a merge with no channels connected yet.
    #[must_use]
    pub fn new(director: &Arc<Director<T>>) -> Self {
        Self {
            director: Arc::clone(director),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Connects one more input channel and returns the sender's handle.
    pub fn connect_input(&mut self) -> Receiver<T> {
        let rx = self
            .director
            .channel(format!("merge.input[{}]", self.inputs.len()));
        self.inputs.push(rx.clone());
        rx
    }

    /// Connects one more output channel and returns the consumer's handle.
    pub fn connect_output(&mut self) -> Receiver<T> {
        let rx = self
            .director
            .channel(format!("merge.output[{}]", self.outputs.len()));
        self.outputs.push(rx.clone());
        rx
    }

    /// Forwards exactly one token: first-ready input to every output, with
    /// no observable taken-but-undelivered intermediate state between the
    /// receive and the delivery. Returns the forwarded value.
    pub fn fire(&self) -> ActorResult<T>
    where
        T: Clone,
    {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(ActorError::NoConnectedChannels);
        }
        Ok(self
            .director
            .get_from_any_put_to_all(&self.inputs, &self.outputs)?)
    }
}
