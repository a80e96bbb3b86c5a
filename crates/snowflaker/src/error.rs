/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Rejected generator configuration.
///
/// Produced by [`Config::validate`] and by [`SnowflakeGenerator::try_new`].
/// The values are reported exactly as supplied, before any conversion, so a
/// negative ID from a raw configuration bundle shows up as-is in the message.
///
/// [`Config::validate`]: crate::Config::validate
/// [`SnowflakeGenerator::try_new`]: crate::SnowflakeGenerator::try_new
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The worker ID does not fit the 5-bit worker field.
    #[error("worker ID set to {worker_id} which is invalid (expected 0..={max})")]
    InvalidWorkerId { worker_id: i64, max: u64 },

    /// The datacenter ID does not fit the 5-bit datacenter field.
    #[error("datacenter ID set to {datacenter_id} which is invalid (expected 0..={max})")]
    InvalidDatacenterId { datacenter_id: i64, max: u64 },

    /// The starting sequence does not fit the 12-bit sequence field.
    #[error("sequence start set to {sequence} which is invalid (expected 0..={max})")]
    InvalidSequence { sequence: i64, max: u64 },

    /// The custom epoch lies before the Unix epoch.
    #[error("custom epoch {epoch}ms is before the Unix epoch")]
    NegativeEpoch { epoch: i64 },
}

/// An unrecognized name for one of the generator's option enums.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("unknown {option} `{value}` (expected one of: {expected})")]
pub struct ParseOptionError {
    pub option: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// All errors the generator can produce.
///
/// Sequence exhaustion is not an error: running out of sequence numbers
/// within a millisecond is reported as [`Poll::Pending`] and waited out.
///
/// [`Poll::Pending`]: crate::Poll::Pending
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The generator could not be constructed.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The clock moved backward and the generator runs with
    /// [`ClockPolicy::Fail`]. Retrying once the clock has caught up succeeds.
    ///
    /// [`ClockPolicy::Fail`]: crate::ClockPolicy::Fail
    #[error("clock is moving backwards, rejecting requests until {last_timestamp} (now {now})")]
    ClockRegression { now: u64, last_timestamp: u64 },

    /// The clock reported a time earlier than the custom epoch.
    #[error("clock reading {now}ms is earlier than the custom epoch {epoch}ms")]
    ClockBeforeEpoch { now: u64, epoch: u64 },

    /// The time since the custom epoch no longer fits the timestamp field.
    #[error("relative timestamp {timestamp}ms exceeds the maximum of {max}ms")]
    TimestampOverflow { timestamp: u64, max: u64 },

    /// A thread panicked while holding a generator lock.
    ///
    /// Only reachable with the standard library mutex; `parking_lot` mutexes
    /// do not poison.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use std::sync::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
