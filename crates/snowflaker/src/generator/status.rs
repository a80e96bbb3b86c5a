use crate::id::SnowflakeId;

/// Represents the result of attempting to generate a new Snowflake ID.
///
/// This type models the outcome of `try_poll_id()`:
///
/// - [`Poll::Ready`] indicates a new ID was successfully generated.
/// - [`Poll::Pending`] means the generator cannot produce a new ID until the
///   clock advances, either because the sequence is exhausted for the current
///   millisecond or because the clock moved backward under
///   [`ClockPolicy::Wait`].
///
/// This allows non-blocking generation loops and clean backoff strategies.
///
/// [`ClockPolicy::Wait`]: crate::ClockPolicy::Wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// No ID could be generated right now.
    Pending {
        /// How many milliseconds the clock must advance before a retry can
        /// succeed.
        yield_for: u64,
    },
}
