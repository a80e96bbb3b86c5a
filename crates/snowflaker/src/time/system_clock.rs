use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::TimeSource;

/// Reads the operating system's wall clock on every call.
///
/// The wall clock follows NTP and manual adjustments, so it can move backward.
/// The generator detects that and applies its [`ClockPolicy`]. Use
/// [`MonotonicClock`] to rule regressions out entirely.
///
/// A system time before 1970 reads as `0`.
///
/// [`ClockPolicy`]: crate::ClockPolicy
/// [`MonotonicClock`]: crate::MonotonicClock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
