use core::{future::Future, time::Duration};

use super::SleepProvider;
use crate::{
    error::Result,
    generator::{IdGenerator, Poll},
    id::SnowflakeId,
};

/// Extension trait for asynchronously generating Snowflake IDs.
///
/// Instead of blocking the thread while the generator waits for the clock, the
/// returned future sleeps through the given [`SleepProvider`] and retries.
/// Callers on the same generator still go through its lock, so IDs stay unique
/// across tasks and threads.
pub trait IdGeneratorAsyncExt {
    /// Returns a future that resolves to the next available Snowflake ID.
    ///
    /// Whenever the generator reports [`Poll::Pending`], the future sleeps for
    /// the reported number of milliseconds using `S` and polls again.
    ///
    /// # Errors
    ///
    /// Resolves to the first error reported by [`IdGenerator::try_poll_id`].
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
            loop {
                let dur = match self.try_poll_id()? {
                    Poll::Ready { id } => return Ok(id),
                    Poll::Pending { yield_for } => Duration::from_millis(yield_for),
                };
                S::sleep_for(dur).await;
            }
        }
    }
}
