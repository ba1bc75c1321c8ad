/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `frostid` can emit.
///
/// Configuration variants are only produced at construction time. Once a
/// generator exists, the per-call failures are [`Error::ClockRegression`] and
/// [`Error::SequenceWaitTimeout`], and neither of them ever advances or
/// corrupts generator state.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The datacenter ID does not fit the 5-bit field.
    #[error("datacenter id {0} out of range (0..=31)")]
    DatacenterIdOutOfRange(u64),

    /// The worker ID does not fit the 5-bit field.
    #[error("worker id {0} out of range (0..=31)")]
    WorkerIdOutOfRange(u64),

    /// The configured epoch lies ahead of the clock's current reading, so no
    /// timestamp delta can be computed. A generator is never constructed in
    /// this situation.
    #[error("epoch {epoch_ms}ms is ahead of the current clock reading {now_ms}ms")]
    EpochAheadOfClock { epoch_ms: u64, now_ms: u64 },

    /// The wall clock moved backwards between two generation attempts,
    /// typically after an NTP correction or a VM migration.
    ///
    /// Reissuing an identifier under the regressed clock could collide with
    /// one already handed out, so the call fails instead. Generator state is
    /// left exactly as it was; retrying is safe once the clock catches up.
    #[error("clock moved backwards by {drift_ms}ms")]
    ClockRegression { drift_ms: u64 },

    /// Waiting for the clock to advance past an exhausted millisecond
    /// exceeded the configured [`WaitPolicy`] cap.
    ///
    /// [`WaitPolicy`]: crate::WaitPolicy
    #[error("gave up after {waited_ms}ms waiting for the clock to advance")]
    SequenceWaitTimeout { waited_ms: u64 },

    /// The operation failed because the generator lock was poisoned.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do not poison, so this
    /// variant is not available.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator state lock poisoned")]
    LockPoisoned,

    /// A state store operation failed. Non-fatal to ongoing generation: the
    /// in-memory state keeps working, but crash-recovery integrity is
    /// degraded until a snapshot succeeds again.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<std::sync::PoisonError<std::sync::MutexGuard<'_, T>>> for Error {
    fn from(_: std::sync::PoisonError<std::sync::MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}

/// Failures reported by a [`StateStore`] or while decoding a persisted
/// snapshot.
///
/// [`StateStore`]: crate::StateStore
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The underlying storage backend failed.
    #[error("state store I/O: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot buffer is shorter than the fixed encoding.
    #[error("state snapshot truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The snapshot was written by an unknown schema version.
    #[error("unsupported state schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u8, expected: u8 },

    /// The snapshot decoded but its contents are not usable.
    #[error("state snapshot rejected: {reason}")]
    Corrupt { reason: &'static str },
}
