//! # CONCLAVE Core Engine
//!
//! Multiway, blocking, atomic data exchange between OS threads.
//!
//! A *conclave* cannot conclude until every participant is present; this
//! crate provides exactly that kind of synchronization. Concurrent actors
//! exchange opaque tokens through single-slot [`Receiver`]s, coordinated by
//! a [`Director`]: one lock and one condition variable per session through
//! which every exchange is linearized.
//!
//! ## Architecture Rules
//!
//! 1. **One monitor per session** - all receiver slots and all worker
//!    blocked/runnable transitions live under the director's lock
//! 2. **Wait in a loop** - every park re-checks its predicate on wakeup;
//!    lost-wakeup bugs are a design defect, not a tuning problem
//! 3. **Cancellation is cooperative** - the stop flag is checked on both
//!    sides of every wait and blocked primitives unwind, never retry
//!
//! ## Example
//!
//! ```rust,ignore
//! use conclave_core::Director;
//!
//! let director = Director::new();
//! let a = director.channel("a");
//! let b = director.channel("b");
//!
//! // Barrier: returns only when *both* channels hold a token.
//! let tokens = director.get_from_all(&[a, b])?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod director;
pub mod error;
pub mod receiver;
pub mod worker;

pub use director::{BlockCause, Director, WorkerId};
pub use error::{RendezvousError, RendezvousResult};
pub use receiver::{ChannelId, Receiver};
pub use worker::Worker;
