use core::{future::Future, pin::Pin, time::Duration};

use crate::{
    error::Result,
    futures::{IdGeneratorAsyncExt, SleepProvider},
    generator::IdGenerator,
    id::SnowflakeId,
};

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider for use in async applications built on Tokio.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// Yielding instead of sleeping resumes polling as soon as the scheduler gets
/// back to the task, at the cost of a tighter polling loop. Under heavy
/// contention [`TokioSleep`] is usually cheaper. Long clock-regression waits
/// spin through the scheduler until the clock catches up.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    /// Tokio's `yield_now()` returns a private future type, so it is boxed.
    type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sleep_for(_dur: Duration) -> Self::Sleep {
        Box::pin(tokio::task::yield_now())
    }
}

/// Extension trait for asynchronously generating Snowflake IDs on the
/// [`tokio`](https://docs.rs/tokio) runtime.
///
/// Uses [`TokioSleep`] as the sleep provider so callers do not have to name
/// one.
pub trait IdGeneratorAsyncTokioExt {
    /// Returns a future that resolves to the next available Snowflake ID
    /// using [`TokioSleep`].
    ///
    /// # Errors
    ///
    /// Resolves to the first error reported by the generator.
    fn next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>>;
}

impl<G> IdGeneratorAsyncTokioExt for G
where
    G: IdGenerator + Sync,
{
    fn next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>> {
        <Self as IdGeneratorAsyncExt>::try_next_id_async::<TokioSleep>(self)
    }
}
