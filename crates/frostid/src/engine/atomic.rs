use portable_atomic::{AtomicU64, Ordering};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ClockSource, GenerationState, GeneratorIdentity, IdGenerator, IdPoll, Result, SnowflakeId,
    StateStore, WaitPolicy,
};

use super::wait::WaitCycle;
use super::{check_epoch, observe_clock, seed_word, word_to_state};

/// A lock-free generator suitable for multi-threaded environments.
///
/// The packed (timestamp, sequence) word lives in an [`AtomicU64`] and every
/// update is a compare-and-swap, so there is no lock to contend on or poison.
/// A lost race simply retries; fairness across threads is sacrificed for
/// throughput.
///
/// ## Recommended When
/// - Many threads share one worker identity under high contention
/// - Peak throughput matters more than fair ordering between threads
///
/// ## See Also
/// - [`BasicGenerator`]
/// - [`LockGenerator`]
///
/// [`BasicGenerator`]: crate::BasicGenerator
/// [`LockGenerator`]: crate::LockGenerator
pub struct AtomicGenerator<C>
where
    C: ClockSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    identity: GeneratorIdentity,
    clock: C,
    wait: WaitPolicy,
}

impl<C> AtomicGenerator<C>
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
    /// use frostid::{AtomicGenerator, DEFAULT_EPOCH_MS, GeneratorIdentity, SystemClock};
    ///
    /// let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
    /// let generator = AtomicGenerator::new(identity, SystemClock)?;
    ///
    /// let ids = generator.next_batch(16)?;
    /// assert!(ids.windows(2).all(|w| w[0] < w[1]));
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
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(word.to_raw())),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(word.to_raw()),
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
    /// Fails on clock regression; the state word is untouched because the
    /// failing attempt never reaches its compare-and-swap.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdPoll> {
        let current_raw = self.state.load(Ordering::Relaxed);
        let current = SnowflakeId::from_raw(current_raw);
        let now_delta = observe_clock(&self.identity, &self.clock, current.timestamp())?;

        let next = if now_delta == current.timestamp() {
            if current.has_sequence_room() {
                current.increment_sequence()
            } else {
                return Ok(IdPoll::Pending { yield_for: 1 });
            }
        } else {
            current.rollover_to_timestamp(now_delta)
        };

        if self
            .state
            .compare_exchange(current_raw, next.to_raw(), Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            Ok(IdPoll::Ready { id: next })
        } else {
            // Another thread won the race. Yield 0 to retry immediately.
            Ok(IdPoll::Pending { yield_for: 0 })
        }
    }

    /// Generates the next identifier, backing off through exhausted
    /// milliseconds and lost races.
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
    /// Instead of one compare-and-swap per identifier, each successful swap
    /// claims the whole remaining sequence range of the current millisecond,
    /// so a batch costs a handful of atomic operations rather than `n`.
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
            let remaining = (n - ids.len()) as u64;
            let current_raw = self.state.load(Ordering::Relaxed);
            let current = SnowflakeId::from_raw(current_raw);
            let now_delta = observe_clock(&self.identity, &self.clock, current.timestamp())?;

            let (first_seq, take) = if now_delta == current.timestamp() {
                let room = SnowflakeId::max_sequence() - current.sequence();
                if room == 0 {
                    cycle.pause(1)?;
                    continue;
                }
                (current.sequence() + 1, room.min(remaining))
            } else {
                (0, (SnowflakeId::max_sequence() + 1).min(remaining))
            };

            let last = SnowflakeId::from_components(
                now_delta,
                self.identity.datacenter_id(),
                self.identity.worker_id(),
                first_seq + take - 1,
            );
            if self
                .state
                .compare_exchange(current_raw, last.to_raw(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                for seq in first_seq..first_seq + take {
                    ids.push(SnowflakeId::from_components(
                        now_delta,
                        self.identity.datacenter_id(),
                        self.identity.worker_id(),
                        seq,
                    ));
                }
                cycle.reset();
            } else {
                cycle.pause(0)?;
            }
        }
        Ok(ids)
    }

    /// Takes an immutable snapshot of the generator's progress. A single
    /// atomic load, so the snapshot can never be torn.
    pub fn snapshot(&self) -> Result<GenerationState> {
        let word = SnowflakeId::from_raw(self.state.load(Ordering::Relaxed));
        Ok(word_to_state(&self.identity, word))
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

impl<C> IdGenerator for AtomicGenerator<C>
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
