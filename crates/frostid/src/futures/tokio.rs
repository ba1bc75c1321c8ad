use core::time::Duration;

use super::SleepProvider;

/// A [`SleepProvider`] backed by the Tokio timer.
pub struct TokioSleep;

impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}
