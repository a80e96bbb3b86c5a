use core::fmt;
use std::sync::Arc;

/// Severity of a generator [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Per-ID detail, normally filtered out.
    Trace,
    /// Lifecycle information.
    Info,
    /// The generator observed something that threatens ID uniqueness.
    Fatal,
}

/// A structured diagnostic emitted by the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Event {
    /// Emitted once by a successful construction.
    Started {
        timestamp_shift: u32,
        datacenter_id_bits: u32,
        worker_id_bits: u32,
        sequence_bits: u32,
        datacenter_id: u64,
        worker_id: u64,
    },
    /// Emitted for every ID handed out. `timestamp` is the raw clock reading,
    /// before the custom epoch is subtracted.
    Generated {
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    },
    /// The clock read earlier than the timestamp of the last issued ID.
    ClockRegressed { now: u64, last_timestamp: u64 },
}

impl Event {
    /// Returns the severity of this event.
    pub const fn level(&self) -> Level {
        match self {
            Self::Started { .. } => Level::Info,
            Self::Generated { .. } => Level::Trace,
            Self::ClockRegressed { .. } => Level::Fatal,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                timestamp_shift,
                datacenter_id_bits,
                worker_id_bits,
                sequence_bits,
                datacenter_id,
                worker_id,
            } => write!(
                f,
                "generator starting. timestamp left shift {timestamp_shift}, datacenter id bits \
                 {datacenter_id_bits}, worker id bits {worker_id_bits}, sequence bits \
                 {sequence_bits}, datacenter id {datacenter_id}, worker id {worker_id}"
            ),
            Self::Generated {
                timestamp,
                datacenter_id,
                worker_id,
                sequence,
            } => write!(
                f,
                "generating snowflake, timestamp={timestamp} datacenter_id={datacenter_id} \
                 worker_id={worker_id} sequence={sequence}"
            ),
            Self::ClockRegressed {
                now,
                last_timestamp,
            } => write!(
                f,
                "clock is moving backwards (now {now}). Rejecting requests until {last_timestamp}."
            ),
        }
    }
}

/// A sink for generator diagnostics.
///
/// The generator calls this from inside its critical section, so
/// implementations should return quickly. Logging cannot fail ID generation:
/// the method has no way to report an error.
///
/// # Example
///
/// ```
/// use snowflaker::{Event, Level, Logger};
///
/// struct StderrFatal;
/// impl Logger for StderrFatal {
///     fn log(&self, event: &Event) {
///         if event.level() == Level::Fatal {
///             eprintln!("{event}");
///         }
///     }
/// }
/// ```
pub trait Logger {
    /// Records one event.
    fn log(&self, event: &Event);
}

impl<L: Logger + ?Sized> Logger for &L {
    fn log(&self, event: &Event) {
        (**self).log(event);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, event: &Event) {
        (**self).log(event);
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _event: &Event) {}
}

/// Forwards events to the [`tracing`] ecosystem.
///
/// [`Level::Fatal`] maps to `ERROR`, since `tracing` has no fatal level.
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl Logger for TracingLogger {
    fn log(&self, event: &Event) {
        match *event {
            Event::Started {
                timestamp_shift,
                datacenter_id_bits,
                worker_id_bits,
                sequence_bits,
                datacenter_id,
                worker_id,
            } => tracing::info!(
                timestamp_shift,
                datacenter_id_bits,
                worker_id_bits,
                sequence_bits,
                datacenter_id,
                worker_id,
                "snowflake generator starting"
            ),
            Event::Generated {
                timestamp,
                datacenter_id,
                worker_id,
                sequence,
            } => tracing::trace!(
                timestamp,
                datacenter_id,
                worker_id,
                sequence,
                "generating snowflake"
            ),
            Event::ClockRegressed {
                now,
                last_timestamp,
            } => tracing::error!(
                now,
                last_timestamp,
                "clock is moving backwards, rejecting requests until {last_timestamp}"
            ),
        }
    }
}
