use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default epoch: Wednesday, January 1, 2020 00:00:00 UTC.
pub const DEFAULT_EPOCH_MS: u64 = 1_577_836_800_000;

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// Implementations are **not** required to be monotonic: NTP corrections or
/// VM migration may cause [`now_millis`] to return a value smaller than a
/// previous call. Detecting and reacting to that is the generator's job, not
/// the clock's.
///
/// # Example
///
/// ```
/// use frostid::ClockSource;
///
/// struct FixedTime;
/// impl ClockSource for FixedTime {
///     fn now_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.now_millis(), 1234);
/// ```
///
/// [`now_millis`]: ClockSource::now_millis
pub trait ClockSource {
    /// Returns the current wall-clock time in milliseconds since the Unix
    /// epoch.
    fn now_millis(&self) -> u64;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// The operating system wall clock.
///
/// Reads [`SystemTime::now`] on every call. Subject to external adjustment,
/// which the generators detect as a clock regression rather than papering
/// over.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock before UNIX_EPOCH")
            .as_millis() as u64
    }
}
