use core::cell::Cell;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ClockSource, GenerationState, GeneratorIdentity, IdGenerator, IdPoll, Result, SnowflakeId,
    StateStore, WaitPolicy,
};

use super::{check_epoch, observe_clock, seed_word, word_to_state};
use super::wait::WaitCycle;

/// A non-concurrent generator suitable for single-threaded environments.
///
/// The state word lives in a [`Cell`], so there is no guard at all: the
/// caller guarantees exclusivity by construction (the type is not `Sync`).
/// This is the fastest variant.
///
/// ## Recommended When
/// - One generator per thread, with worker IDs partitioned statically at
///   startup
/// - You want the lowest per-call overhead
///
/// ## See Also
/// - [`LockGenerator`]
/// - [`AtomicGenerator`]
///
/// [`LockGenerator`]: crate::LockGenerator
/// [`AtomicGenerator`]: crate::AtomicGenerator
#[derive(Debug)]
pub struct BasicGenerator<C>
where
    C: ClockSource,
{
    state: Cell<SnowflakeId>,
    identity: GeneratorIdentity,
    clock: C,
    wait: WaitPolicy,
}

impl<C> BasicGenerator<C>
where
    C: ClockSource,
{
    /// Creates a generator with zeroed progress.
    ///
    /// # Errors
    ///
    /// Returns [`EpochAheadOfClock`] when the identity's epoch lies in the
    /// clock's future; such a generator could never compute a timestamp
    /// delta, so it is not constructed.
    ///
    /// # Example
    ///
    /// ```
    /// use frostid::{BasicGenerator, DEFAULT_EPOCH_MS, GeneratorIdentity, SystemClock};
    ///
    /// let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
    /// let generator = BasicGenerator::new(identity, SystemClock)?;
    ///
    /// let id = generator.next_id()?;
    /// assert_eq!(id.datacenter_id(), 1);
    /// assert_eq!(id.worker_id(), 2);
    /// # Ok::<(), frostid::Error>(())
    /// ```
    ///
    /// [`EpochAheadOfClock`]: crate::Error::EpochAheadOfClock
    pub fn new(identity: GeneratorIdentity, clock: C) -> Result<Self> {
        Self::with_state(identity, clock, GenerationState::default())
    }

    /// Creates a generator seeded from a persisted snapshot.
    ///
    /// A snapshot carrying a timestamp the clock has not reached (saved, then
    /// the clock stepped backwards) is adopted verbatim: the first generation
    /// call will report the regression rather than reuse identifier space.
    ///
    /// # Errors
    ///
    /// Returns [`EpochAheadOfClock`] as for [`Self::new`], or a storage error
    /// when the snapshot is inconsistent with the identity.
    ///
    /// [`EpochAheadOfClock`]: crate::Error::EpochAheadOfClock
    pub fn with_state(identity: GeneratorIdentity, clock: C, state: GenerationState) -> Result<Self> {
        check_epoch(&identity, &clock)?;
        Ok(Self {
            state: Cell::new(seed_word(&identity, &state)?),
            identity,
            clock,
            wait: WaitPolicy::default(),
        })
    }

    /// Creates a generator from the snapshot held in `store`, or with zeroed
    /// progress when the store is empty.
    ///
    /// # Errors
    ///
    /// Propagates store and decode failures in addition to the constructor
    /// errors above.
    pub fn resume<S>(identity: GeneratorIdentity, clock: C, store: &S) -> Result<Self>
    where
        S: StateStore + ?Sized,
    {
        let state = GenerationState::load_from(store)?.unwrap_or_default();
        Self::with_state(identity, clock, state)
    }

    /// Replaces the stuck-clock wait cap.
    #[must_use]
    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Runs one non-blocking generation attempt.
    ///
    /// # Errors
    ///
    /// Fails on clock regression; the state is left exactly as it was.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdPoll> {
        let state = self.state.get();
        let now_delta = observe_clock(&self.identity, &self.clock, state.timestamp())?;

        if now_delta == state.timestamp() {
            if state.has_sequence_room() {
                let updated = state.increment_sequence();
                self.state.set(updated);
                Ok(IdPoll::Ready { id: updated })
            } else {
                Ok(IdPoll::Pending { yield_for: 1 })
            }
        } else {
            let updated = state.rollover_to_timestamp(now_delta);
            self.state.set(updated);
            Ok(IdPoll::Ready { id: updated })
        }
    }

    /// Generates the next identifier, backing off through exhausted
    /// milliseconds.
    ///
    /// # Errors
    ///
    /// Fails on clock regression or when the wait exceeds the configured
    /// [`WaitPolicy`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut cycle = WaitCycle::new(&self.wait);
        loop {
            match self.try_poll_id()? {
                IdPoll::Ready { id } => return Ok(id),
                IdPoll::Pending { yield_for } => cycle.pause(yield_for)?,
            }
        }
    }

    /// Generates `n` strictly increasing identifiers.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::next_id`]. On failure the identifiers
    /// already claimed are discarded, never reissued.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_batch(&self, n: usize) -> Result<Vec<SnowflakeId>> {
        let mut ids = Vec::with_capacity(n);
        let mut cycle = WaitCycle::new(&self.wait);
        while ids.len() < n {
            match self.try_poll_id()? {
                IdPoll::Ready { id } => {
                    ids.push(id);
                    cycle.reset();
                }
                IdPoll::Pending { yield_for } => cycle.pause(yield_for)?,
            }
        }
        Ok(ids)
    }

    /// Takes an immutable snapshot of the generator's progress.
    pub fn snapshot(&self) -> Result<GenerationState> {
        Ok(word_to_state(&self.identity, self.state.get()))
    }

    /// The identity stamped into every identifier.
    pub fn identity(&self) -> &GeneratorIdentity {
        &self.identity
    }

    /// The cap applied to stuck-clock waits.
    pub fn wait_policy(&self) -> &WaitPolicy {
        &self.wait
    }
}

impl<C> IdGenerator for BasicGenerator<C>
where
    C: ClockSource,
{
    fn try_poll_id(&self) -> Result<IdPoll> {
        self.try_poll_id()
    }

    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id()
    }

    fn next_batch(&self, n: usize) -> Result<Vec<SnowflakeId>> {
        self.next_batch(n)
    }

    fn snapshot(&self) -> Result<GenerationState> {
        self.snapshot()
    }

    fn identity(&self) -> &GeneratorIdentity {
        self.identity()
    }

    fn wait_policy(&self) -> &WaitPolicy {
        self.wait_policy()
    }
}
