//! Coordination-free 64-bit identifiers for distributed systems.
//!
//! Each identifier packs a millisecond timestamp, a datacenter ID, a worker
//! ID and a per-millisecond sequence into one `u64`, so independently
//! configured producers never collide and identifiers from one producer sort
//! in generation order. Generation never needs a network round-trip; the only
//! coordination is the one-time, static assignment of (datacenter, worker)
//! pairs.
//!
//! Three generator variants share the same state machine and differ only in
//! their concurrency guard: [`BasicGenerator`] (single-threaded, no guard),
//! [`LockGenerator`] (mutex) and [`AtomicGenerator`] (lock-free
//! compare-and-swap). Generators are plain values owned by the composing
//! application; run as many independent ones per process as you have worker
//! identities.
//!
//! The wall clock is the only source of non-determinism, and it is not
//! trusted: a backwards step surfaces as [`Error::ClockRegression`] instead
//! of silently reissuing identifier space, and a clock that refuses to
//! advance past an exhausted millisecond trips the [`WaitPolicy`] cap. State
//! can be snapshotted through a [`StateStore`] and restored after a restart.
//!
//! # Example
//!
//! ```
//! use frostid::{DEFAULT_EPOCH_MS, GeneratorIdentity, LockGenerator, SystemClock};
//!
//! let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
//! let generator = LockGenerator::new(identity, SystemClock)?;
//!
//! let id = generator.next_id()?;
//! assert_eq!(id.datacenter_id(), 1);
//! assert_eq!(id.worker_id(), 2);
//!
//! let batch = generator.next_batch(100)?;
//! assert!(batch.windows(2).all(|w| w[0] < w[1]));
//! # Ok::<(), frostid::Error>(())
//! ```

mod clock;
mod engine;
mod error;
#[cfg(feature = "async-tokio")]
mod futures;
mod id;
mod identity;
#[cfg(feature = "serde")]
pub mod serde;
mod state;
mod store;
mod validate;

pub use crate::clock::*;
pub use crate::engine::*;
pub use crate::error::*;
#[cfg(feature = "async-tokio")]
pub use crate::futures::*;
pub use crate::id::*;
pub use crate::identity::*;
pub use crate::state::*;
pub use crate::store::*;
pub use crate::validate::*;
