//! # Director - The Rendezvous Monitor
//!
//! One lock. One condition variable. Every exchange in a session is
//! linearized through them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Director<T>                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Mutex<DirectorState>              Condvar ("state changed") │
//! │  ┌──────────────────────────┐                                │
//! │  │ slot arena  [ ][x][ ][x] │  ◄── Receiver handles (index)  │
//! │  │ worker registry          │  ◄── Worker threads (blocked/  │
//! │  │ stop flag                │      runnable bookkeeping)     │
//! │  └──────────────────────────┘                                │
//! └──────────────────────────────────────────────────────────────┘
//!          ▲                ▲                 ▲
//!   get_from_all      get_from_any       put_to_all / put_to_any
//!   (barrier)         (first ready)      (fan-out delivery)
//! ```
//!
//! ## The Discipline
//!
//! Every primitive holds the lock for its entire check-and-mutate sequence
//! and releases it only while parked in [`Condvar::wait`]. Every wakeup
//! re-checks the predicate in a loop; nothing here waits once and assumes.
//! Every mutation that might unblock a waiter is followed by a broadcast.
//!
//! The director is an explicit, dependency-injected object, never a hidden
//! singleton: independent sessions coexist and tear down deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::{RendezvousError, RendezvousResult};
use crate::receiver::{ChannelId, Receiver};

/// Why a worker thread is currently parked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockCause {
    /// Waiting for a token to arrive in a receiver slot.
    Receive,
    /// Waiting for a full receiver slot to drain.
    Send,
    /// Waiting for an actor-level condition (pool/queue emptiness).
    Condition,
}

/// Identity of a registered worker thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

/// One receiver slot in the director's arena.
struct Slot<T> {
    /// The single pending token. At most one at any instant.
    token: Option<T>,
    /// Threads currently parked in a blocking `get` on this slot.
    /// [`Director::put_to_any`] targets manned slots so a token is never
    /// stranded where no consumer will drain it.
    getters: usize,
    /// Channel label, kept for tracing.
    label: String,
}

/// Bookkeeping record for one registered worker thread.
struct WorkerRecord {
    /// Worker name, kept for tracing.
    name: String,
    /// `Some` while the worker is parked; the director's blocked count
    /// must mirror these exactly or quiescence detection breaks.
    blocked: Option<BlockCause>,
}

/// Everything the monitor guards.
struct DirectorState<T> {
    /// Receiver slot arena. Slots are never freed within a session.
    slots: Vec<Slot<T>>,
    /// Registered worker threads and their blocked/runnable status.
    workers: HashMap<WorkerId, WorkerRecord>,
    /// Maps OS threads to their worker registration, so internal waits
    /// can tag the calling worker without threading ids through APIs.
    by_thread: HashMap<ThreadId, WorkerId>,
    /// Count of workers with `blocked.is_some()`.
    blocked: usize,
    /// Next worker id to hand out.
    next_worker: u64,
    /// Cooperative shutdown flag. Checked before and after every wait.
    stop_requested: bool,
}

impl<T> DirectorState<T> {
    fn set_blocked(&mut self, id: WorkerId, cause: BlockCause) {
        if let Some(record) = self.workers.get_mut(&id) {
            if record.blocked.is_none() {
                self.blocked += 1;
            }
            record.blocked = Some(cause);
        }
    }

    fn set_runnable(&mut self, id: WorkerId) {
        if let Some(record) = self.workers.get_mut(&id) {
            if record.blocked.is_some() {
                self.blocked -= 1;
            }
            record.blocked = None;
        }
    }
}

/// The central coordinator of one rendezvous session.
///
/// Owns the monitor (lock + condition variable) that all receivers and
/// worker threads synchronize on, the receiver slot arena, and the worker
/// registry used for quiescence detection.
///
/// Constructed as `Arc<Director<T>>` and handed to every participant.
pub struct Director<T> {
    /// The single session lock.
    state: Mutex<DirectorState<T>>,
    /// Broadcast on every state change that might unblock a waiter.
    changed: Condvar,
    /// Lock-free mirror of the stop flag for cheap polling.
    stopping: AtomicBool,
}

impl<T> Default for DirectorState<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            workers: HashMap::new(),
            by_thread: HashMap::new(),
            blocked: 0,
            next_worker: 0,
            stop_requested: false,
        }
    }
}

impl<T> Director<T> {
    /// Creates a new session monitor.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DirectorState::default()),
            changed: Condvar::new(),
            stopping: AtomicBool::new(false),
        })
    }

    /// Opens a new channel endpoint and returns its receiver handle.
    ///
    /// Called when a channel is connected; the slot starts empty and lives
    /// until the session is torn down.
    #[must_use]
    pub fn channel(self: &Arc<Self>, label: impl Into<String>) -> Receiver<T> {
        let label = label.into();
        let index = {
            let mut state = self.state.lock();
            let index = state.slots.len();
            state.slots.push(Slot { token: None, getters: 0, label: label.clone() });
            index
        };
        tracing::trace!(channel = %label, index, "channel connected");
        Receiver::new(Arc::clone(self), ChannelId(index))
    }

    /// Resets the session for a fresh run: drains every slot and clears
    /// the stop flag. Worker registrations are left untouched (workers are
    /// added dynamically as actors start background work).
    pub fn initialize(&self) {
        let mut state = self.state.lock();
        for slot in &mut state.slots {
            slot.token = None;
        }
        state.stop_requested = false;
        self.stopping.store(false, Ordering::Release);
        self.changed.notify_all();
        tracing::debug!("director initialized");
    }

    /// Requests cooperative shutdown of the whole session.
    ///
    /// Every primitive currently parked wakes up and unwinds with
    /// [`RendezvousError::Cancelled`] without completing its pending
    /// exchange; nothing retries.
    pub fn request_stop(&self) {
        let mut state = self.state.lock();
        state.stop_requested = true;
        self.stopping.store(true, Ordering::Release);
        self.changed.notify_all();
        drop(state);
        tracing::debug!("session stop requested");
    }

    /// Returns true once shutdown has been requested.
    #[inline]
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    // ========================================================================
    // Worker thread bookkeeping
    // ========================================================================

    /// Registers the calling thread as a long-lived worker of this session.
    ///
    /// Internal waits issued from this thread are tagged in the registry
    /// automatically, so the blocked/runnable count stays exact.
    pub fn register_worker(&self, name: &str) -> WorkerId {
        let mut state = self.state.lock();
        let id = WorkerId(state.next_worker);
        state.next_worker += 1;
        state.workers.insert(
            id,
            WorkerRecord { name: name.to_string(), blocked: None },
        );
        state.by_thread.insert(std::thread::current().id(), id);
        self.changed.notify_all();
        tracing::trace!(worker = name, ?id, "worker registered");
        id
    }

    /// Deregisters a worker, typically on its way out of the session.
    pub fn deregister_worker(&self, id: WorkerId) {
        let mut state = self.state.lock();
        if let Some(record) = state.workers.remove(&id) {
            if record.blocked.is_some() {
                state.blocked -= 1;
            }
            tracing::trace!(worker = %record.name, ?id, "worker deregistered");
        }
        state.by_thread.retain(|_, worker| *worker != id);
        self.changed.notify_all();
    }

    /// Records that a worker is about to park outside the director's own
    /// wait path. Workers must call this immediately before any such wait.
    pub fn worker_blocked(&self, id: WorkerId, cause: BlockCause) {
        let mut state = self.state.lock();
        state.set_blocked(id, cause);
        self.changed.notify_all();
    }

    /// Records that a worker resumed after an external wait. Must be called
    /// immediately after the wait returns.
    pub fn worker_unblocked(&self, id: WorkerId) {
        let mut state = self.state.lock();
        state.set_runnable(id);
        self.changed.notify_all();
    }

    /// Number of registered worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    /// Number of registered workers currently parked.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.state.lock().blocked
    }

    /// True when every registered worker is blocked and no predicate can
    /// become satisfiable without external input. Consumed by deadlock /
    /// liveness detection outside this crate; the counts feeding it are
    /// maintained under the lock and are exact.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        let state = self.state.lock();
        !state.workers.is_empty() && state.blocked == state.workers.len()
    }

    // ========================================================================
    // The wait primitive
    // ========================================================================

    /// Releases the lock, parks until any notification, reacquires.
    ///
    /// All rendezvous primitives are built by repeatedly checking a
    /// predicate and calling this when the predicate is false. The stop
    /// flag is checked on both sides of the park.
    fn wait_for_change(
        &self,
        state: &mut MutexGuard<'_, DirectorState<T>>,
        cause: BlockCause,
    ) -> RendezvousResult<()> {
        if state.stop_requested {
            return Err(RendezvousError::Cancelled);
        }
        let me = state.by_thread.get(&std::thread::current().id()).copied();
        if let Some(id) = me {
            state.set_blocked(id, cause);
            // Becoming blocked can complete quiescence for an observer.
            self.changed.notify_all();
        }
        self.changed.wait(state);
        if let Some(id) = me {
            state.set_runnable(id);
        }
        if state.stop_requested {
            return Err(RendezvousError::Cancelled);
        }
        Ok(())
    }

    /// Waits until `predicate` is true, parking on the session's condition
    /// variable between checks.
    ///
    /// The predicate runs while the director's lock is held, so any state
    /// it reads under its own short-lived cell lock is linearized with the
    /// rendezvous primitives (lock order: director first, cell second).
    pub fn wait_until(
        &self,
        cause: BlockCause,
        mut predicate: impl FnMut() -> bool,
    ) -> RendezvousResult<()> {
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            if predicate() {
                return Ok(());
            }
            self.wait_for_change(&mut state, cause)?;
        }
    }

    /// Runs `mutate` under the director's lock, then broadcasts.
    ///
    /// This is how coordination actors mutate their pool/queue state so the
    /// change is visible atomically to every blocked participant.
    pub fn run_locked<R>(&self, mutate: impl FnOnce() -> R) -> R {
        let state = self.state.lock();
        let out = mutate();
        self.changed.notify_all();
        drop(state);
        out
    }

    // ========================================================================
    // Slot operations (the Receiver contract)
    // ========================================================================

    fn same_session(&self, receiver: &Receiver<T>) -> bool {
        std::ptr::eq(self, Arc::as_ptr(receiver.director()))
    }

    fn check_set(&self, receivers: &[Receiver<T>]) -> RendezvousResult<()> {
        if receivers.is_empty() {
            return Err(RendezvousError::EmptyReceiverSet);
        }
        if receivers.iter().any(|r| !self.same_session(r)) {
            return Err(RendezvousError::ForeignReceiver);
        }
        Ok(())
    }

    /// Blocking put into one slot. Waits while the slot is full; never
    /// silently drops data.
    pub(crate) fn slot_put(&self, id: ChannelId, token: T) -> RendezvousResult<()> {
        let mut token = Some(token);
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            let slot = &mut state.slots[id.0];
            if slot.token.is_none() {
                slot.token = token.take();
                self.changed.notify_all();
                return Ok(());
            }
            self.wait_for_change(&mut state, BlockCause::Send)?;
        }
    }

    /// Blocking get from one slot. Waits while the slot is empty; on
    /// success the token is removed and space is announced.
    pub(crate) fn slot_get(&self, id: ChannelId) -> RendezvousResult<T> {
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            if let Some(token) = state.slots[id.0].token.take() {
                self.changed.notify_all();
                return Ok(token);
            }
            // Advertise the parked getter so put_to_any can target this
            // slot; a getter appearing is itself a wakeup-worthy change.
            state.slots[id.0].getters += 1;
            self.changed.notify_all();
            let waited = self.wait_for_change(&mut state, BlockCause::Receive);
            state.slots[id.0].getters -= 1;
            waited?;
        }
    }

    /// Non-blocking take.
    pub(crate) fn slot_try_get(&self, id: ChannelId) -> Option<T> {
        let mut state = self.state.lock();
        let token = state.slots[id.0].token.take();
        if token.is_some() {
            self.changed.notify_all();
        }
        token
    }

    /// Non-blocking occupancy probe.
    pub(crate) fn slot_is_full(&self, id: ChannelId) -> bool {
        self.state.lock().slots[id.0].token.is_some()
    }

    /// Number of threads parked in a blocking get on this slot.
    pub(crate) fn slot_waiting_getters(&self, id: ChannelId) -> usize {
        self.state.lock().slots[id.0].getters
    }

    pub(crate) fn slot_label(&self, id: ChannelId) -> String {
        self.state.lock().slots[id.0].label.clone()
    }

    // ========================================================================
    // Multiway rendezvous primitives
    // ========================================================================

    /// Simultaneous receive on every receiver in the set.
    ///
    /// Succeeds only when every receiver holds a deliverable token at once;
    /// all of them are then drained in the same critical section, so no
    /// interleaved partial state is externally observable. This is the
    /// barrier primitive: no sender proceeds until every sender is ready.
    pub fn get_from_all(&self, receivers: &[Receiver<T>]) -> RendezvousResult<Vec<T>> {
        self.check_set(receivers)?;
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            let all_ready = receivers
                .iter()
                .all(|r| state.slots[r.id().0].token.is_some());
            if all_ready {
                let mut tokens = Vec::with_capacity(receivers.len());
                for receiver in receivers {
                    if let Some(token) = state.slots[receiver.id().0].token.take() {
                        tokens.push(token);
                    }
                }
                debug_assert_eq!(tokens.len(), receivers.len());
                self.changed.notify_all();
                return Ok(tokens);
            }
            self.wait_for_change(&mut state, BlockCause::Receive)?;
        }
    }

    /// Receives from the first receiver in iteration order that holds a
    /// token; parks and rescans after every notification if none is ready.
    ///
    /// Policy: first-ready-wins in slice order, deliberately preserved from
    /// the original semantics. There is no fairness guarantee; a receiver
    /// that is always scanned first and always ready can starve the rest.
    /// Callers needing rotation can reorder the slice they pass.
    pub fn get_from_any(&self, receivers: &[Receiver<T>]) -> RendezvousResult<T> {
        self.check_set(receivers)?;
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            if let Some(token) = Self::take_first(&mut state, receivers) {
                self.changed.notify_all();
                return Ok(token);
            }
            self.wait_for_change(&mut state, BlockCause::Receive)?;
        }
    }

    fn take_first(
        state: &mut MutexGuard<'_, DirectorState<T>>,
        receivers: &[Receiver<T>],
    ) -> Option<T> {
        for receiver in receivers {
            if let Some(token) = state.slots[receiver.id().0].token.take() {
                return Some(token);
            }
        }
        None
    }

    /// Delivers a token to one receiver in the set, parking until a slot
    /// accepts it. Returns the channel that accepted the token.
    ///
    /// Delivery targets a waiting consumer: the first free slot with a
    /// parked getter wins. A slot nobody is getting on is used only when
    /// no receiver in the whole set has a parked getter, so a token is
    /// never stranded in a slot a departed consumer will not drain while
    /// other consumers starve.
    pub fn put_to_any(&self, token: T, receivers: &[Receiver<T>]) -> RendezvousResult<ChannelId> {
        self.check_set(receivers)?;
        let mut token = Some(token);
        let mut state = self.state.lock();
        loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            if let Some(id) = Self::pick_delivery_slot(&state, receivers) {
                state.slots[id.0].token = token.take();
                self.changed.notify_all();
                return Ok(id);
            }
            self.wait_for_change(&mut state, BlockCause::Send)?;
        }
    }

    /// Picks the slot for a put_to_any delivery: the first free slot with
    /// a parked getter, falling back to any free slot only when nobody in
    /// the set is waiting to get.
    fn pick_delivery_slot(
        state: &MutexGuard<'_, DirectorState<T>>,
        receivers: &[Receiver<T>],
    ) -> Option<ChannelId> {
        let mut free = None;
        let mut anyone_waiting = false;
        for receiver in receivers {
            let slot = &state.slots[receiver.id().0];
            anyone_waiting |= slot.getters > 0;
            if slot.token.is_none() {
                if slot.getters > 0 {
                    return Some(receiver.id());
                }
                if free.is_none() {
                    free = Some(receiver.id());
                }
            }
        }
        if anyone_waiting { None } else { free }
    }

    /// Runs the deposit rounds of a put-to-all under an already-held guard.
    fn deliver_to_all(
        &self,
        state: &mut MutexGuard<'_, DirectorState<T>>,
        token: &T,
        receivers: &[Receiver<T>],
    ) -> RendezvousResult<()>
    where
        T: Clone,
    {
        let mut pending: Vec<ChannelId> = receivers.iter().map(Receiver::id).collect();
        loop {
            if state.stop_requested {
                // Deposits already made are not recalled; remaining
                // deliveries are abandoned.
                return Err(RendezvousError::Cancelled);
            }
            let before = pending.len();
            pending.retain(|id| {
                let slot = &mut state.slots[id.0];
                if slot.token.is_none() {
                    slot.token = Some(token.clone());
                    false
                } else {
                    true
                }
            });
            if pending.len() != before {
                self.changed.notify_all();
            }
            if pending.is_empty() {
                return Ok(());
            }
            self.wait_for_change(state, BlockCause::Send)?;
        }
    }

    /// Delivers the same token value to every receiver in the target set,
    /// blocking on each individually if full. One coordinated step from the
    /// caller's perspective; an empty set is a vacuous success.
    pub fn put_to_all(&self, token: &T, receivers: &[Receiver<T>]) -> RendezvousResult<()>
    where
        T: Clone,
    {
        if receivers.is_empty() {
            return Ok(());
        }
        if receivers.iter().any(|r| !self.same_session(r)) {
            return Err(RendezvousError::ForeignReceiver);
        }
        let mut state = self.state.lock();
        self.deliver_to_all(&mut state, token, receivers)
    }

    /// Composite primitive: receives from whichever source is ready first
    /// and forwards the token to every destination, without releasing the
    /// lock between the take and the first delivery attempt. No other
    /// thread can observe a taken-but-undelivered state between the phases.
    ///
    /// Returns the forwarded token value.
    pub fn get_from_any_put_to_all(
        &self,
        sources: &[Receiver<T>],
        destinations: &[Receiver<T>],
    ) -> RendezvousResult<T>
    where
        T: Clone,
    {
        self.check_set(sources)?;
        if destinations.iter().any(|r| !self.same_session(r)) {
            return Err(RendezvousError::ForeignReceiver);
        }
        let mut state = self.state.lock();
        let token = loop {
            if state.stop_requested {
                return Err(RendezvousError::Cancelled);
            }
            if let Some(token) = Self::take_first(&mut state, sources) {
                break token;
            }
            self.wait_for_change(&mut state, BlockCause::Receive)?;
        };
        // A source slot just drained; announce before the delivery rounds.
        self.changed.notify_all();
        self.deliver_to_all(&mut state, &token, destinations)?;
        Ok(token)
    }
}
