//! # CONCLAVE Coordination Actors
//!
//! Small state machines built purely from the core's rendezvous
//! primitives. They are both the useful surface of the engine and the
//! usage patterns that exercise its correctness:
//!
//! - [`Barrier`]: fires only when every connected channel is ready
//! - [`Merge`]: forwards the first-ready input, no buffering
//! - [`ResourcePool`]: grant/release token pool with a collector thread
//! - [`Buffer`]: bounded FIFO decoupling with a reader thread
//!
//! ## Teardown
//!
//! Actors do not stop a session on drop. Tear a stage down by calling
//! `director.request_stop()` and then `join()` on each actor that runs a
//! background worker.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod barrier;
pub mod buffer;
pub mod config;
pub mod error;
pub mod merge;
pub mod resource_pool;

pub use barrier::Barrier;
pub use buffer::Buffer;
pub use config::{BarrierConfig, BufferConfig, PoolConfig, StageConfig};
pub use error::{ActorError, ActorResult};
pub use merge::Merge;
pub use resource_pool::ResourcePool;
