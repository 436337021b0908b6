//! # Buffer - Bounded FIFO Decoupling
//!
//! Single input, single output, optional capacity bound. A dedicated
//! reader thread admits tokens from the input while there is room; the
//! firing side hands the head of the queue to the output. The queue itself
//! imposes the only FIFO discipline in the core - the monitor is otherwise
//! first-ready-wins.
//!
//! ```text
//!  producer ──put──► [input slot] ──reader──► ┌───────────────┐
//!                     (1 token)               │ FIFO backlog  │
//!                                             │ len ≤ capacity│
//!  consumer ◄──get── [output slot] ◄──fire─── └───────────────┘
//! ```
//!
//! Shrinking the capacity below the current backlog drops nothing: the
//! reader just stops admitting until the backlog drains under the new
//! bound.

use std::collections::VecDeque;
use std::sync::Arc;

use conclave_core::{BlockCause, Director, Receiver, Worker};
use parking_lot::Mutex;

use crate::error::{ActorError, ActorResult};

/// Queue state, mutated only inside director-locked sections.
struct BufferState<T> {
    items: VecDeque<T>,
    /// `None` is unbounded.
    capacity: Option<usize>,
}

impl<T> BufferState<T> {
    fn has_room(&self) -> bool {
        self.capacity.map_or(true, |cap| self.items.len() < cap)
    }
}

/// FIFO buffer actor with a background reader thread.
pub struct Buffer<T> {
    director: Arc<Director<T>>,
    input: Receiver<T>,
    output: Receiver<T>,
    state: Arc<Mutex<BufferState<T>>>,
    reader: Option<Worker>,
}

impl<T: Send + 'static> Buffer<T> {
    /// Creates a buffer that admits at most `capacity` queued tokens.
    #[must_use]
    pub fn bounded(director: &Arc<Director<T>>, capacity: usize) -> Self {
        Self::with_capacity(director, Some(capacity))
    }

    /// Creates a buffer with no admission bound.
    #[must_use]
    pub fn unbounded(director: &Arc<Director<T>>) -> Self {
        Self::with_capacity(director, None)
    }

    fn with_capacity(director: &Arc<Director<T>>, capacity: Option<usize>) -> Self {
        Self {
            director: Arc::clone(director),
            input: director.channel("buffer.input"),
            output: director.channel("buffer.output"),
            state: Arc::new(Mutex::new(BufferState { items: VecDeque::new(), capacity })),
            reader: None,
        }
    }

    /// The producer-side handle.
    #[must_use]
    pub fn input(&self) -> Receiver<T> {
        self.input.clone()
    }

    /// The consumer-side handle.
    #[must_use]
    pub fn output(&self) -> Receiver<T> {
        self.output.clone()
    }

    /// Current backlog length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// True when no tokens are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Current admission bound (`None` is unbounded).
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.state.lock().capacity
    }

    /// Changes the admission bound.
    ///
    /// Shrinking below the current backlog does not drop tokens; new
    /// admissions stall until the backlog drains below the new bound.
    pub fn set_capacity(&self, capacity: Option<usize>) {
        self.director.run_locked(|| {
            self.state.lock().capacity = capacity;
        });
        tracing::debug!(?capacity, "buffer capacity changed");
    }

    /// Starts the background reader thread.
    ///
    /// The reader blocks while the backlog is at capacity, otherwise
    /// performs a blocking get on the input and appends. It exits cleanly
    /// when the session stop is requested.
    pub fn start(&mut self) -> ActorResult<()> {
        if self.reader.is_some() {
            return Err(ActorError::AlreadyStarted);
        }
        let director = Arc::clone(&self.director);
        let input = self.input.clone();
        let state = Arc::clone(&self.state);
        self.reader = Some(Worker::spawn(&self.director, "buffer.reader", move || {
            loop {
                director.wait_until(BlockCause::Condition, || state.lock().has_room())?;
                let token = input.get()?;
                // The bound may have shrunk while parked in the get.
                // Re-check with the token in hand: nothing is dropped and
                // the backlog never grows past the current bound.
                director.wait_until(BlockCause::Condition, || state.lock().has_room())?;
                director.run_locked(|| state.lock().items.push_back(token));
            }
        }));
        Ok(())
    }

    /// Blocks while the backlog is empty, then sends the head of the queue
    /// to the output.
    ///
    /// If the session is cancelled after the head was taken but before the
    /// output accepted it, that single in-flight token is dropped with the
    /// rest of the session state.
    pub fn fire(&self) -> ActorResult<()> {
        loop {
            self.director.wait_until(BlockCause::Condition, || {
                !self.state.lock().items.is_empty()
            })?;
            let head = self
                .director
                .run_locked(|| self.state.lock().items.pop_front());
            // Lost the head to a concurrent fire; re-check emptiness.
            if let Some(token) = head {
                self.output.put(token)?;
                return Ok(());
            }
        }
    }

    /// Waits for the reader thread to exit. Request the session stop first.
    pub fn join(&mut self) {
        if let Some(reader) = &mut self.reader {
            reader.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_is_preserved() {
        let director: Arc<Director<u32>> = Director::new();
        let mut buffer = Buffer::unbounded(&director);
        buffer.start().unwrap();

        let input = buffer.input();
        let output = buffer.output();
        for token in 1..=3 {
            input.put(token).unwrap();
        }

        for expected in 1..=3 {
            buffer.fire().unwrap();
            assert_eq!(output.get().unwrap(), expected);
        }

        director.request_stop();
        buffer.join();
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let director: Arc<Director<u32>> = Director::new();
        let mut buffer = Buffer::bounded(&director, 4);
        buffer.start().unwrap();
        assert_eq!(buffer.start().unwrap_err(), ActorError::AlreadyStarted);

        director.request_stop();
        buffer.join();
    }

    #[test]
    fn test_backlog_never_exceeds_capacity() {
        let director: Arc<Director<u32>> = Director::new();
        let mut buffer = Buffer::bounded(&director, 1);
        buffer.start().unwrap();

        let input = buffer.input();
        let output = buffer.output();

        input.put(1).unwrap(); // admitted into the backlog
        input.put(2).unwrap(); // parked in the input slot, not admitted

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(buffer.len(), 1);

        buffer.fire().unwrap();
        assert_eq!(output.get().unwrap(), 1);
        buffer.fire().unwrap();
        assert_eq!(output.get().unwrap(), 2);

        director.request_stop();
        buffer.join();
    }

    #[test]
    fn test_capacity_shrink_stalls_but_drops_nothing() {
        let director: Arc<Director<u32>> = Director::new();
        let mut buffer = Buffer::unbounded(&director);
        buffer.start().unwrap();

        let input = buffer.input();
        let output = buffer.output();
        for token in 1..=4 {
            input.put(token).unwrap();
        }
        // Let the reader admit everything before shrinking.
        while buffer.len() < 4 {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        buffer.set_capacity(Some(2));
        input.put(5).unwrap(); // held by the reader, not admitted
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(buffer.len(), 4, "backlog must not grow past the new bound");

        // Drain everything; nothing was dropped and order held.
        for expected in 1..=5 {
            buffer.fire().unwrap();
            assert_eq!(output.get().unwrap(), expected);
        }

        director.request_stop();
        buffer.join();
    }
}
