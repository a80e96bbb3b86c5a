use core::time::Duration;
use std::sync::Arc;

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
///
/// The default custom epoch of every generator.
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// A trait for clocks that report wall-clock milliseconds.
///
/// This abstraction allows you to plug in the system clock, a monotonic
/// ticker, or a mocked time source in tests. Readings are milliseconds since
/// the Unix epoch (or any other fixed origin shared with the generator's
/// custom epoch). The generator subtracts its custom epoch itself.
///
/// Implementations are called at least once per generated ID, so they should
/// be cheap.
///
/// # Example
///
/// ```
/// use snowflaker::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
