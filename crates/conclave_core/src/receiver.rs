//! # Receiver - The Atomic Hand-off Point
//!
//! One receiver is bound to one channel endpoint and holds at most one
//! pending token exchange at a time. A sender's `put` and a receiver's
//! `get` meet in the middle: `put` blocks while the slot is full, `get`
//! blocks while it is empty, and neither side proceeds past the exchange
//! until the other has made room for it.
//!
//! Receivers are cheap-clone handles (an `Arc` on the session's director
//! plus an arena index); the slot itself lives inside the director so every
//! read and write happens under the session lock.

use std::sync::Arc;

use crate::director::Director;
use crate::error::RendezvousResult;

/// Identity of one channel endpoint inside a session.
///
/// Indexes the director's slot arena; never reused within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    /// The slot index inside the session arena.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle onto a single-slot exchange point.
///
/// Created by [`Director::channel`] when a channel is connected. Clones
/// refer to the same slot: the producer side and the consumer side of a
/// channel each hold one.
pub struct Receiver<T> {
    director: Arc<Director<T>>,
    id: ChannelId,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            director: Arc::clone(&self.director),
            id: self.id,
        }
    }
}

impl<T> Receiver<T> {
    pub(crate) fn new(director: Arc<Director<T>>, id: ChannelId) -> Self {
        Self { director, id }
    }

    /// The channel identity this receiver represents.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// The label given when the channel was connected.
    #[must_use]
    pub fn label(&self) -> String {
        self.director.slot_label(self.id)
    }

    pub(crate) fn director(&self) -> &Arc<Director<T>> {
        &self.director
    }

    /// Deposits a token, blocking while the slot is full.
    ///
    /// Data is never silently dropped: either the deposit happens or the
    /// call unwinds with [`Cancelled`](crate::RendezvousError::Cancelled)
    /// still holding nothing in the slot.
    pub fn put(&self, token: T) -> RendezvousResult<()> {
        self.director.slot_put(self.id, token)
    }

    /// Removes and returns the pending token, blocking while the slot is
    /// empty. Waiting senders are notified that space is available.
    pub fn get(&self) -> RendezvousResult<T> {
        self.director.slot_get(self.id)
    }

    /// Non-blocking take. Returns `None` if the slot is empty.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        self.director.slot_try_get(self.id)
    }

    /// True while a token is pending in the slot.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.director.slot_is_full(self.id)
    }

    /// Number of threads currently parked in [`get`](Self::get) on this
    /// slot. Used by grant-style producers to tell a manned slot from one
    /// whose consumer has already left.
    #[must_use]
    pub fn waiting_getters(&self) -> usize {
        self.director.slot_waiting_getters(self.id)
    }
}

#[cfg(test)]
mod tests {
    use crate::director::Director;
    use crate::error::RendezvousError;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_put_then_get_round_trip() {
        let director: Arc<Director<String>> = Director::new();
        let rx = director.channel("wire");

        rx.put("hello".to_string()).unwrap();
        assert!(rx.is_full());
        assert_eq!(rx.get().unwrap(), "hello");
        assert!(!rx.is_full());
    }

    #[test]
    fn test_get_blocks_until_put() {
        let director: Arc<Director<u32>> = Director::new();
        let rx = director.channel("wire");
        let tx = rx.clone();

        let (probe_tx, probe_rx) = crossbeam_channel::bounded(1);
        let reader = thread::spawn(move || {
            let token = rx.get().unwrap();
            probe_tx.send(token).unwrap();
        });

        assert!(
            probe_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "get must block while the slot is empty"
        );

        tx.put(42).unwrap();
        assert_eq!(probe_rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
        reader.join().unwrap();
    }

    #[test]
    fn test_put_blocks_while_slot_is_full() {
        let director: Arc<Director<u32>> = Director::new();
        let rx = director.channel("wire");
        let tx = rx.clone();

        tx.put(1).unwrap();

        let (probe_tx, probe_rx) = crossbeam_channel::bounded(1);
        let writer = thread::spawn(move || {
            tx.put(2).unwrap();
            probe_tx.send(()).unwrap();
        });

        assert!(
            probe_rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "second put must block until the slot drains"
        );

        assert_eq!(rx.get().unwrap(), 1);
        probe_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(rx.get().unwrap(), 2);
        writer.join().unwrap();
    }

    #[test]
    fn test_try_get_is_non_blocking() {
        let director: Arc<Director<u32>> = Director::new();
        let rx = director.channel("wire");

        assert_eq!(rx.try_get(), None);
        rx.put(3).unwrap();
        assert_eq!(rx.try_get(), Some(3));
        assert_eq!(rx.try_get(), None);
    }

    #[test]
    fn test_exchange_after_stop_is_cancelled() {
        let director: Arc<Director<u32>> = Director::new();
        let rx = director.channel("wire");

        director.request_stop();
        assert_eq!(rx.put(1).unwrap_err(), RendezvousError::Cancelled);
        assert_eq!(rx.get().unwrap_err(), RendezvousError::Cancelled);
    }

    #[test]
    fn test_clones_share_the_same_slot() {
        let director: Arc<Director<u32>> = Director::new();
        let rx = director.channel("wire");
        let tx = rx.clone();

        tx.put(7).unwrap();
        assert_eq!(rx.id(), tx.id());
        assert_eq!(rx.label(), "wire");
        assert_eq!(rx.get().unwrap(), 7);
    }
}
