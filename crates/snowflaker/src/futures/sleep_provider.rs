use core::{future::Future, time::Duration};

/// Abstracts over how to sleep for a given [`Duration`] in async contexts.
///
/// This keeps the async helpers independent of any particular runtime.
pub trait SleepProvider {
    /// `Send` so the surrounding future can move across worker threads.
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(dur: Duration) -> Self::Sleep;
}
