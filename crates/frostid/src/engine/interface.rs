use crate::{GenerationState, GeneratorIdentity, Result, SnowflakeId, WaitPolicy};

use super::IdPoll;

/// The common surface of the generator variants.
///
/// All variants run the same state transition per attempt; they differ only
/// in the concurrency guard around the packed (timestamp, sequence) word, a
/// choice that affects throughput and fairness but never the identifiers
/// produced.
pub trait IdGenerator {
    /// Runs one non-blocking generation attempt.
    ///
    /// # Errors
    ///
    /// Fails on clock regression (state untouched) or, for lock-based
    /// variants without `parking-lot`, on a poisoned lock.
    fn try_poll_id(&self) -> Result<IdPoll>;

    /// Generates the next identifier, backing off while the current
    /// millisecond's sequence space is exhausted.
    ///
    /// # Errors
    ///
    /// Fails on clock regression, on a poisoned lock, or with
    /// [`SequenceWaitTimeout`] when the clock refuses to advance within the
    /// configured [`WaitPolicy`].
    ///
    /// [`SequenceWaitTimeout`]: crate::Error::SequenceWaitTimeout
    fn next_id(&self) -> Result<SnowflakeId>;

    /// Generates `n` strictly increasing identifiers, amortizing the guard
    /// over the whole batch.
    ///
    /// The batch may span several exhausted milliseconds. If it fails
    /// partway, identifiers already claimed are discarded and never reissued;
    /// the sequence space they occupied is simply skipped.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`IdGenerator::next_id`].
    fn next_batch(&self, n: usize) -> Result<Vec<SnowflakeId>>;

    /// Takes an immutable snapshot of the generator's progress for
    /// persistence. Never called on the hot path by the generator itself.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned lock.
    fn snapshot(&self) -> Result<GenerationState>;

    /// The immutable identity this generator stamps into every identifier.
    fn identity(&self) -> &GeneratorIdentity;

    /// The cap applied to stuck-clock waits.
    fn wait_policy(&self) -> &WaitPolicy;
}
