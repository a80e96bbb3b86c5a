use core::{fmt, str::FromStr};

use crate::{
    error::{ConfigError, ParseOptionError},
    id::SnowflakeId,
    time::TWITTER_EPOCH,
};

/// What the generator does when the clock reads earlier than the timestamp of
/// the last issued ID.
///
/// Every policy emits a fatal [`Event::ClockRegressed`].
///
/// [`Event::ClockRegressed`]: crate::Event::ClockRegressed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockPolicy {
    /// Keep generating with the regressed reading.
    ///
    /// Matches generators that only log the anomaly. Once the clock replays a
    /// millisecond that was already used, this **can issue duplicate and
    /// out-of-order IDs**.
    LogAndContinue,
    /// Report [`Poll::Pending`] until the clock catches up with the last
    /// issued timestamp. The blocking and async helpers sleep through it.
    ///
    /// [`Poll::Pending`]: crate::Poll::Pending
    #[default]
    Wait,
    /// Fail the call with [`Error::ClockRegression`]. Retrying after the clock
    /// has caught up succeeds.
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    Fail,
}

impl ClockPolicy {
    const EXPECTED: &'static str = "log-and-continue, wait, fail";

    /// Returns the kebab-case name accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LogAndContinue => "log-and-continue",
            Self::Wait => "wait",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for ClockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClockPolicy {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log-and-continue" | "log" | "continue" => Ok(Self::LogAndContinue),
            "wait" | "block" => Ok(Self::Wait),
            "fail" | "error" => Ok(Self::Fail),
            _ => Err(ParseOptionError {
                option: "clock policy",
                value: s.to_owned(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Which callers a generator's critical section excludes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LockScope {
    /// One mutex per generator. Independent generators never contend.
    #[default]
    Instance,
    /// Additionally hold a single process-wide mutex, serializing every
    /// `Global` generator in the process against each other. Useful to cap
    /// the total issuance rate of a process.
    Global,
}

impl LockScope {
    const EXPECTED: &'static str = "instance, global";

    /// Returns the name accepted by [`FromStr`].
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockScope {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instance" => Ok(Self::Instance),
            "global" | "process" => Ok(Self::Global),
            _ => Err(ParseOptionError {
                option: "lock scope",
                value: s.to_owned(),
                expected: Self::EXPECTED,
            }),
        }
    }
}

/// Construction-time settings of a [`SnowflakeGenerator`].
///
/// The numeric fields are signed so that values read from an untyped
/// configuration source can be validated rather than wrapped.
///
/// Validation covers every numeric field, not only the coordinates: a
/// `sequence_start` above 4095 or a negative `custom_epoch_ms` is rejected
/// instead of being masked into the ID.
///
/// [`SnowflakeGenerator`]: crate::SnowflakeGenerator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// Machine or process within a datacenter, `0..=31`.
    pub worker_id: i64,
    /// Datacenter or shard group, `0..=31`.
    pub datacenter_id: i64,
    /// Initial sequence counter, `0..=4095`. The first ID always starts a new
    /// millisecond and resets the counter to zero.
    pub sequence_start: i64,
    /// Origin subtracted from every clock reading, in milliseconds since the
    /// Unix epoch.
    pub custom_epoch_ms: i64,
    pub clock_policy: ClockPolicy,
    pub lock_scope: LockScope,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_id: 1,
            datacenter_id: 1,
            sequence_start: 0,
            custom_epoch_ms: TWITTER_EPOCH.as_millis() as i64,
            clock_policy: ClockPolicy::default(),
            lock_scope: LockScope::default(),
        }
    }
}

/// A [`Config`] whose values are known to fit the bit layout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CheckedConfig {
    pub(crate) worker_id: u64,
    pub(crate) datacenter_id: u64,
    pub(crate) sequence_start: u64,
    pub(crate) custom_epoch_ms: u64,
}

impl Config {
    /// Creates a config for the given coordinates, defaults elsewhere.
    pub fn new(worker_id: i64, datacenter_id: i64) -> Self {
        Self {
            worker_id,
            datacenter_id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sequence_start(mut self, sequence_start: i64) -> Self {
        self.sequence_start = sequence_start;
        self
    }

    #[must_use]
    pub fn with_custom_epoch_ms(mut self, custom_epoch_ms: i64) -> Self {
        self.custom_epoch_ms = custom_epoch_ms;
        self
    }

    #[must_use]
    pub fn with_clock_policy(mut self, clock_policy: ClockPolicy) -> Self {
        self.clock_policy = clock_policy;
        self
    }

    #[must_use]
    pub fn with_lock_scope(mut self, lock_scope: LockScope) -> Self {
        self.lock_scope = lock_scope;
        self
    }

    /// Checks every field against the bit layout without building a
    /// generator.
    ///
    /// # Errors
    ///
    /// Returns the first field found out of range.
    ///
    /// # Example
    ///
    /// ```
    /// use snowflaker::{Config, ConfigError};
    ///
    /// assert!(Config::new(31, 31).validate().is_ok());
    /// assert_eq!(
    ///     Config::new(32, 0).validate(),
    ///     Err(ConfigError::InvalidWorkerId { worker_id: 32, max: 31 })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.checked().map(|_| ())
    }

    pub(crate) fn checked(&self) -> Result<CheckedConfig, ConfigError> {
        let worker_id = u64::try_from(self.worker_id)
            .ok()
            .filter(|id| *id <= SnowflakeId::MAX_WORKER_ID)
            .ok_or(ConfigError::InvalidWorkerId {
                worker_id: self.worker_id,
                max: SnowflakeId::MAX_WORKER_ID,
            })?;

        let datacenter_id = u64::try_from(self.datacenter_id)
            .ok()
            .filter(|id| *id <= SnowflakeId::MAX_DATACENTER_ID)
            .ok_or(ConfigError::InvalidDatacenterId {
                datacenter_id: self.datacenter_id,
                max: SnowflakeId::MAX_DATACENTER_ID,
            })?;

        let sequence_start = u64::try_from(self.sequence_start)
            .ok()
            .filter(|seq| *seq <= SnowflakeId::MAX_SEQUENCE)
            .ok_or(ConfigError::InvalidSequence {
                sequence: self.sequence_start,
                max: SnowflakeId::MAX_SEQUENCE,
            })?;

        let custom_epoch_ms =
            u64::try_from(self.custom_epoch_ms).map_err(|_| ConfigError::NegativeEpoch {
                epoch: self.custom_epoch_ms,
            })?;

        Ok(CheckedConfig {
            worker_id,
            datacenter_id,
            sequence_start,
            custom_epoch_ms,
        })
    }
}
