use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ClockSource, GenerationState, GeneratorIdentity, IdGenerator, IdPoll, Result, SnowflakeId,
    StateStore, WaitPolicy,
};

use super::mutex::{Mutex, MutexGuard};
use super::wait::WaitCycle;
use super::{check_epoch, observe_clock, seed_word, word_to_state};

/// A lock-based generator suitable for multi-threaded environments.
///
/// The state word sits behind an [`Arc<Mutex<_>>`]; cloning the generator
/// yields another handle onto the same state, so clones never collide with
/// each other. With the `parking-lot` feature the mutex cannot poison and
/// generation has one less failure mode.
///
/// ## Recommended When
/// - Several threads share one worker identity
/// - Fair access across threads matters more than peak throughput
///
/// ## See Also
/// - [`BasicGenerator`]
/// - [`AtomicGenerator`]
///
/// [`BasicGenerator`]: crate::BasicGenerator
/// [`AtomicGenerator`]: crate::AtomicGenerator
#[derive(Clone, Debug)]
pub struct LockGenerator<C>
where
    C: ClockSource,
{
    #[cfg(feature = "cache-padded")]
    state: Arc<crossbeam_utils::CachePadded<Mutex<SnowflakeId>>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Arc<Mutex<SnowflakeId>>,
    identity: GeneratorIdentity,
    clock: C,
    wait: WaitPolicy,
}

impl<C> LockGenerator<C>
where
    C: ClockSource,
{
    /// Creates a generator with zeroed progress.
    ///
    /// # Errors
    ///
    /// Returns [`EpochAheadOfClock`] when the identity's epoch lies in the
    /// clock's future.
    ///
    /// # Example
    ///
    /// ```
    /// use frostid::{DEFAULT_EPOCH_MS, GeneratorIdentity, LockGenerator, SystemClock};
    ///
    /// let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
    /// let generator = LockGenerator::new(identity, SystemClock)?;
    ///
    /// let first = generator.next_id()?;
    /// let second = generator.next_id()?;
    /// assert!(first < second);
    /// # Ok::<(), frostid::Error>(())
    /// ```
    ///
    /// [`EpochAheadOfClock`]: crate::Error::EpochAheadOfClock
    pub fn new(identity: GeneratorIdentity, clock: C) -> Result<Self> {
        Self::with_state(identity, clock, GenerationState::default())
    }

    /// Creates a generator seeded from a persisted snapshot. A snapshot from
    /// the clock's future is adopted verbatim so the first call reports the
    /// regression.
    ///
    /// # Errors
    ///
    /// As for [`BasicGenerator::with_state`].
    ///
    /// [`BasicGenerator::with_state`]: crate::BasicGenerator::with_state
    pub fn with_state(identity: GeneratorIdentity, clock: C, state: GenerationState) -> Result<Self> {
        check_epoch(&identity, &clock)?;
        let word = seed_word(&identity, &state)?;
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(Mutex::new(word))),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(Mutex::new(word)),
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

    fn lock_state(&self) -> Result<MutexGuard<'_, SnowflakeId>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    /// Runs one non-blocking generation attempt.
    ///
    /// # Errors
    ///
    /// Fails on clock regression (state untouched) or a poisoned lock.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdPoll> {
        let mut word = self.lock_state()?;
        let now_delta = observe_clock(&self.identity, &self.clock, word.timestamp())?;

        if now_delta == word.timestamp() {
            if word.has_sequence_room() {
                *word = word.increment_sequence();
                Ok(IdPoll::Ready { id: *word })
            } else {
                Ok(IdPoll::Pending { yield_for: 1 })
            }
        } else {
            *word = word.rollover_to_timestamp(now_delta);
            Ok(IdPoll::Ready { id: *word })
        }
    }

    /// Generates the next identifier, backing off through exhausted
    /// milliseconds. The lock is released while backing off so other threads
    /// can observe the same pending tick.
    ///
    /// # Errors
    ///
    /// Fails on clock regression, a poisoned lock, or when the wait exceeds
    /// the configured [`WaitPolicy`].
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

    /// Generates `n` strictly increasing identifiers while holding the lock
    /// for the whole batch, amortizing the acquisition cost.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::next_id`]. On failure the identifiers
    /// already claimed are discarded, never reissued.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_batch(&self, n: usize) -> Result<Vec<SnowflakeId>> {
        let mut word = self.lock_state()?;
        let mut ids = Vec::with_capacity(n);
        let mut cycle = WaitCycle::new(&self.wait);

        while ids.len() < n {
            let now_delta = observe_clock(&self.identity, &self.clock, word.timestamp())?;
            if now_delta == word.timestamp() {
                if word.has_sequence_room() {
                    *word = word.increment_sequence();
                    ids.push(*word);
                    cycle.reset();
                } else {
                    cycle.pause(1)?;
                }
            } else {
                *word = word.rollover_to_timestamp(now_delta);
                ids.push(*word);
                cycle.reset();
            }
        }
        Ok(ids)
    }

    /// Takes an immutable snapshot of the generator's progress.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned lock.
    pub fn snapshot(&self) -> Result<GenerationState> {
        let word = self.lock_state()?;
        Ok(word_to_state(&self.identity, *word))
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

impl<C> IdGenerator for LockGenerator<C>
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
