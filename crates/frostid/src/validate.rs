use crate::{ClockSource, GeneratorIdentity, SnowflakeId};

/// Checks that an identifier plausibly originated from a given generator
/// identity.
///
/// This authenticates origin, not production order: an accepted identifier
/// carries the identity's datacenter and worker fields and a timestamp no
/// further in the future than the skew tolerance allows. It cannot prove the
/// identifier was actually issued, only that this identity could have issued
/// it.
#[derive(Clone, Copy, Debug)]
pub struct Validator {
    identity: GeneratorIdentity,
    skew_tolerance_ms: u64,
}

impl Validator {
    /// Default allowance for clock skew between producer and checker.
    pub const DEFAULT_SKEW_TOLERANCE_MS: u64 = 5_000;

    pub fn new(identity: GeneratorIdentity) -> Self {
        Self {
            identity,
            skew_tolerance_ms: Self::DEFAULT_SKEW_TOLERANCE_MS,
        }
    }

    /// Replaces the skew tolerance.
    #[must_use]
    pub fn with_skew_tolerance(mut self, skew_tolerance_ms: u64) -> Self {
        self.skew_tolerance_ms = skew_tolerance_ms;
        self
    }

    /// Returns true iff `id` is consistent with the validator's identity:
    /// reserved bit clear, matching datacenter and worker fields, and a
    /// production time between the epoch and `now + skew_tolerance`.
    ///
    /// # Example
    ///
    /// ```
    /// use frostid::{
    ///     BasicGenerator, DEFAULT_EPOCH_MS, GeneratorIdentity, SystemClock, Validator,
    /// };
    ///
    /// let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
    /// let generator = BasicGenerator::new(identity, SystemClock)?;
    /// let validator = Validator::new(identity);
    ///
    /// let id = generator.next_id()?;
    /// assert!(validator.check(id, &SystemClock));
    /// # Ok::<(), frostid::Error>(())
    /// ```
    pub fn check(&self, id: SnowflakeId, clock: &impl ClockSource) -> bool {
        if !id.is_valid() {
            return false;
        }
        if id.datacenter_id() != self.identity.datacenter_id()
            || id.worker_id() != self.identity.worker_id()
        {
            return false;
        }
        // The delta is unsigned, so the epoch lower bound holds by
        // construction; only the future side needs checking.
        let produced_at_ms = self.identity.epoch_ms() + id.timestamp();
        produced_at_ms <= clock.now_millis() + self.skew_tolerance_ms
    }
}
