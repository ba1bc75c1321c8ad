use core::time::Duration;

/// Abstracts over how to sleep for a given [`Duration`] in async contexts.
///
/// This keeps the async extension generic over runtimes; [`TokioSleep`] is
/// the implementation shipped with this crate.
///
/// [`TokioSleep`]: crate::TokioSleep
pub trait SleepProvider {
    /// `Send` so the future can be moved across worker threads.
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(dur: Duration) -> Self::Sleep;
}
