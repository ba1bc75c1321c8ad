mod sleep;
mod tokio;

pub use sleep::*;
pub use tokio::*;

use core::time::Duration;
use std::time::Instant;

use crate::{Error, IdGenerator, IdPoll, Result, SnowflakeId};

/// Extension trait for asynchronously generating identifiers.
///
/// Instead of blocking the thread through an exhausted millisecond, the
/// future sleeps on the runtime's timer and retries, so other tasks keep
/// running. The generator's [`WaitPolicy`] still caps how long one
/// stuck-clock wait may last.
///
/// [`WaitPolicy`]: crate::WaitPolicy
pub trait IdGeneratorAsyncExt: IdGenerator {
    /// Resolves to the next available identifier.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`IdGenerator::next_id`].
    fn try_next_id_async<S>(&self) -> impl Future<Output = Result<SnowflakeId>>
    where
        S: SleepProvider;
}

impl<G> IdGeneratorAsyncExt for G
where
    G: IdGenerator + Sync,
{
    fn try_next_id_async<S>(&self) -> impl Future<Output = Result<SnowflakeId>>
    where
        S: SleepProvider,
    {
        async {
            let mut wait_started: Option<Instant> = None;
            loop {
                let yield_for = match self.try_poll_id()? {
                    IdPoll::Ready { id } => return Ok(id),
                    IdPoll::Pending { yield_for } => yield_for,
                };

                let started = *wait_started.get_or_insert_with(Instant::now);
                let waited = started.elapsed();
                if waited >= self.wait_policy().max_wait() {
                    return Err(Error::SequenceWaitTimeout {
                        waited_ms: waited.as_millis() as u64,
                    });
                }
                S::sleep_for(Duration::from_millis(yield_for)).await;
            }
        }
    }
}
