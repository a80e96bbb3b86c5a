use core::time::Duration;

use crate::{error::Result, generator::Poll, id::SnowflakeId};

/// Poll interval used by [`IdGenerator::next_id`] while waiting out the last
/// millisecond of an exhausted sequence.
pub const SPIN_INTERVAL: Duration = Duration::from_micros(100);

/// A minimal interface for generating Snowflake IDs.
pub trait IdGenerator {
    /// Attempts to generate the next available ID without blocking.
    ///
    /// The returned [`Poll`] contains either:
    /// - the newly generated ID, or
    /// - how many milliseconds the clock must advance before a retry can
    ///   succeed.
    ///
    /// # Errors
    ///
    /// See [`crate::Error`]. None of the errors leave the generator unusable.
    fn try_poll_id(&self) -> Result<Poll>;

    /// Generates the next ID, calling `f` with the pending duration every time
    /// the generator has to wait.
    ///
    /// `f` decides how to wait: spin, yield, or sleep.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`IdGenerator::try_poll_id`].
    fn next_id_with(&self, mut f: impl FnMut(u64)) -> Result<SnowflakeId> {
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    /// Generates the next ID, sleeping the current thread while the generator
    /// waits for the clock (see [`backoff`]).
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`IdGenerator::try_poll_id`].
    fn next_id(&self) -> Result<SnowflakeId> {
        self.next_id_with(backoff)
    }
}

/// Default wait between polls.
///
/// Waits of at most one millisecond are polled every [`SPIN_INTERVAL`], so an
/// exhausted sequence resumes as soon as the millisecond turns. Longer waits,
/// which only happen after the clock moved backward, sleep for the full
/// duration.
pub fn backoff(yield_for: u64) {
    if yield_for <= 1 {
        std::thread::sleep(SPIN_INTERVAL);
    } else {
        std::thread::sleep(Duration::from_millis(yield_for));
    }
}
