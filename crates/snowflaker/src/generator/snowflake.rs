use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    error::{Error, Result},
    generator::{
        ClockPolicy, Config, IdGenerator, LockScope, Poll,
        mutex::{GLOBAL_LOCK, Mutex, lock},
    },
    id::SnowflakeId,
    log::{Event, Logger},
    time::TimeSource,
};

/// Mutable part of a generator, only touched under its lock.
#[derive(Debug)]
struct State {
    /// Clock reading of the last issued ID, `None` until the first one.
    last_timestamp: Option<u64>,
    sequence: u64,
    /// Set while a clock regression is being waited out, so it is logged once.
    stalled: bool,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Every ID packs the time since the custom epoch, the configured datacenter
/// and worker IDs, and a sequence number that disambiguates IDs issued within
/// the same millisecond (see [`SnowflakeId`] for the layout).
///
/// The clock read, the comparison with the last issued timestamp and the state
/// update run as one critical section. Share the generator between threads by
/// reference or through an [`Arc`](std::sync::Arc).
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Up to 4096 IDs per millisecond, excess demand waits for the next tick
/// - ✅ Configurable clock-regression handling ([`ClockPolicy`])
/// - ✅ Per-instance or process-wide locking ([`LockScope`])
///
/// # Example
/// ```
/// use snowflaker::{Config, NoopLogger, SnowflakeGenerator, SystemClock};
///
/// let generator = SnowflakeGenerator::try_new(Config::new(7, 3), SystemClock, NoopLogger)?;
///
/// let id = generator.next_id()?;
/// assert_eq!(id.worker_id(), 7);
/// assert_eq!(id.datacenter_id(), 3);
/// # Ok::<(), snowflaker::Error>(())
/// ```
pub struct SnowflakeGenerator<T, L>
where
    T: TimeSource,
    L: Logger,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<State>,
    worker_id: u64,
    datacenter_id: u64,
    custom_epoch_ms: u64,
    clock_policy: ClockPolicy,
    lock_scope: LockScope,
    time: T,
    logger: L,
}

impl<T, L> SnowflakeGenerator<T, L>
where
    T: TimeSource,
    L: Logger,
{
    /// Creates a new generator from a [`Config`], a clock and a logger.
    ///
    /// On success a single [`Event::Started`] is logged describing the bit
    /// layout and the configured coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a field of `config` does not fit
    /// the bit layout. Nothing is logged in that case.
    pub fn try_new(config: Config, time: T, logger: L) -> Result<Self> {
        let checked = config.checked()?;

        logger.log(&Event::Started {
            timestamp_shift: SnowflakeId::TIMESTAMP_SHIFT,
            datacenter_id_bits: SnowflakeId::DATACENTER_ID_BITS,
            worker_id_bits: SnowflakeId::WORKER_ID_BITS,
            sequence_bits: SnowflakeId::SEQUENCE_BITS,
            datacenter_id: checked.datacenter_id,
            worker_id: checked.worker_id,
        });

        let state = Mutex::new(State {
            last_timestamp: None,
            sequence: checked.sequence_start,
            stalled: false,
        });

        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            worker_id: checked.worker_id,
            datacenter_id: checked.datacenter_id,
            custom_epoch_ms: checked.custom_epoch_ms,
            clock_policy: config.clock_policy,
            lock_scope: config.lock_scope,
            time,
            logger,
        })
    }

    pub fn worker_id(&self) -> u64 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub fn custom_epoch_ms(&self) -> u64 {
        self.custom_epoch_ms
    }

    pub fn clock_policy(&self) -> ClockPolicy {
        self.clock_policy
    }

    pub fn lock_scope(&self) -> LockScope {
        self.lock_scope
    }

    /// Generates the next ID, sleeping while the generator waits for the
    /// clock.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::next_id`].
    pub fn next_id(&self) -> Result<SnowflakeId> {
        <Self as IdGenerator>::next_id(self)
    }

    /// Generates the next ID, calling `f` with the pending duration whenever
    /// the generator has to wait.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::next_id_with`].
    pub fn next_id_with(&self, f: impl FnMut(u64)) -> Result<SnowflakeId> {
        <Self as IdGenerator>::next_id_with(self, f)
    }

    /// Attempts to generate the next available ID.
    ///
    /// Returns a new, time-ordered, unique ID if generation succeeds. If the
    /// sequence for the current millisecond is exhausted, or the clock moved
    /// backward under [`ClockPolicy::Wait`], it returns [`Poll::Pending`] and
    /// leaves the state untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock moved backward under
    ///   [`ClockPolicy::Fail`]
    /// - [`Error::ClockBeforeEpoch`] if the clock reads earlier than the
    ///   custom epoch
    /// - [`Error::TimestampOverflow`] if the time since the custom epoch no
    ///   longer fits 41 bits
    /// - `Error::LockPoisoned` if the standard library mutex is in use and
    ///   was poisoned
    ///
    /// # Example
    /// ```
    /// use snowflaker::{Config, NoopLogger, Poll, SnowflakeGenerator, SystemClock};
    ///
    /// let generator = SnowflakeGenerator::try_new(Config::default(), SystemClock, NoopLogger)?;
    ///
    /// let id = loop {
    ///     match generator.try_poll_id()? {
    ///         Poll::Ready { id } => break id,
    ///         Poll::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(id.worker_id(), 1);
    /// # Ok::<(), snowflaker::Error>(())
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let _global = match self.lock_scope {
            LockScope::Global => Some(lock(&GLOBAL_LOCK)?),
            LockScope::Instance => None,
        };
        let mut state = lock(self.state())?;

        let now = self.time.current_millis();
        let last_timestamp = state.last_timestamp;

        let sequence = match last_timestamp {
            None => 0,
            Some(last) => match now.cmp(&last) {
                Ordering::Greater => 0,
                Ordering::Equal => {
                    if state.sequence < SnowflakeId::MAX_SEQUENCE {
                        state.sequence + 1
                    } else {
                        return Ok(Poll::Pending { yield_for: 1 });
                    }
                }
                Ordering::Less => match self.cold_clock_behind(&mut state, now, last)? {
                    Some(pending) => return Ok(pending),
                    None => 0,
                },
            },
        };

        let timestamp = self.relative_timestamp(now)?;

        state.last_timestamp = Some(now);
        state.sequence = sequence;
        state.stalled = false;

        self.logger.log(&Event::Generated {
            timestamp: now,
            datacenter_id: self.datacenter_id,
            worker_id: self.worker_id,
            sequence,
        });

        Ok(Poll::Ready {
            id: SnowflakeId::from_components(
                timestamp,
                self.datacenter_id,
                self.worker_id,
                sequence,
            ),
        })
    }

    fn state(&self) -> &Mutex<State> {
        &self.state
    }

    /// Applies the clock policy. `Ok(None)` means generate with `now` anyway.
    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, state: &mut State, now: u64, last: u64) -> Result<Option<Poll>> {
        let event = Event::ClockRegressed {
            now,
            last_timestamp: last,
        };

        match self.clock_policy {
            ClockPolicy::LogAndContinue => {
                self.logger.log(&event);
                Ok(None)
            }
            ClockPolicy::Wait => {
                if !state.stalled {
                    state.stalled = true;
                    self.logger.log(&event);
                }
                Ok(Some(Poll::Pending {
                    yield_for: last - now,
                }))
            }
            ClockPolicy::Fail => {
                self.logger.log(&event);
                Err(Error::ClockRegression {
                    now,
                    last_timestamp: last,
                })
            }
        }
    }

    fn relative_timestamp(&self, now: u64) -> Result<u64> {
        let timestamp = now
            .checked_sub(self.custom_epoch_ms)
            .ok_or(Error::ClockBeforeEpoch {
                now,
                epoch: self.custom_epoch_ms,
            })?;

        if timestamp > SnowflakeId::MAX_TIMESTAMP {
            return Err(Error::TimestampOverflow {
                timestamp,
                max: SnowflakeId::MAX_TIMESTAMP,
            });
        }

        Ok(timestamp)
    }
}

impl<T, L> IdGenerator for SnowflakeGenerator<T, L>
where
    T: TimeSource,
    L: Logger,
{
    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}

impl<T, L> core::fmt::Debug for SnowflakeGenerator<T, L>
where
    T: TimeSource,
    L: Logger,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnowflakeGenerator")
            .field("worker_id", &self.worker_id)
            .field("datacenter_id", &self.datacenter_id)
            .field("custom_epoch_ms", &self.custom_epoch_ms)
            .field("clock_policy", &self.clock_policy)
            .field("lock_scope", &self.lock_scope)
            .finish_non_exhaustive()
    }
}
