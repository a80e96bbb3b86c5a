use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use snowflaker::{
    ClockPolicy, Config, LockScope, MonotonicClock, SnowflakeId, SystemClock, TWITTER_EPOCH,
    TimeSource,
};

/// Runtime configuration for the `snowflaker-filter` binary.
///
/// Every value is read from a CLI flag or its environment variable, after a
/// `.env` file in the working directory has been loaded.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "snowflaker-filter",
    version,
    about = "Stamps a Snowflake ID onto every record of a JSON Lines stream"
)]
pub struct CliArgs {
    /// Worker ID embedded in every generated ID, `0..=31`.
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = 1, allow_negative_numbers = true)]
    pub worker_id: i64,

    /// Datacenter ID embedded in every generated ID, `0..=31`.
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", default_value_t = 1, allow_negative_numbers = true)]
    pub datacenter_id: i64,

    /// Initial sequence counter, `0..=4095`.
    ///
    /// Environment variable: `SEQUENCE_START`
    #[arg(long, env = "SEQUENCE_START", default_value_t = 0, allow_negative_numbers = true)]
    pub sequence_start: i64,

    /// Custom epoch in milliseconds since the Unix epoch. Defaults to the
    /// Twitter epoch.
    ///
    /// Environment variable: `CUSTOM_EPOCH_MS`
    #[arg(
        long,
        env = "CUSTOM_EPOCH_MS",
        default_value_t = TWITTER_EPOCH.as_millis() as i64,
        allow_negative_numbers = true
    )]
    pub custom_epoch_ms: i64,

    /// Record field that receives the ID. An existing value is replaced.
    ///
    /// Environment variable: `TARGET_FIELD_NAME`
    #[arg(long, env = "TARGET_FIELD_NAME", default_value_t = String::from("id"))]
    pub column: String,

    /// How the ID is written into the record.
    ///
    /// Environment variable: `ID_FORMAT`
    #[arg(long, env = "ID_FORMAT", value_enum, default_value_t = IdFormat::Number)]
    pub id_format: IdFormat,

    /// Time source for the generator.
    ///
    /// Environment variable: `CLOCK`
    #[arg(long, env = "CLOCK", value_enum, default_value_t = ClockKind::System)]
    pub clock: ClockKind,

    /// Behavior when the clock moves backward: `wait`, `fail` or
    /// `log-and-continue`.
    ///
    /// Environment variable: `CLOCK_POLICY`
    #[arg(long, env = "CLOCK_POLICY", default_value_t = ClockPolicy::Wait)]
    pub clock_policy: ClockPolicy,

    /// Lock granularity: `instance` or `global`.
    ///
    /// Environment variable: `LOCK_SCOPE`
    #[arg(long, env = "LOCK_SCOPE", default_value_t = LockScope::Instance)]
    pub lock_scope: LockScope,

    /// Read records from this file instead of stdin.
    ///
    /// Environment variable: `INPUT`
    #[arg(long, env = "INPUT")]
    pub input: Option<PathBuf>,

    /// Log output format. Logs always go to stderr.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// JSON representation of a stamped ID.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFormat {
    /// A JSON number. Exact for every ID, but consumers parsing numbers as
    /// doubles lose precision above 2^53.
    Number,
    /// The decimal ID as a JSON string.
    String,
}

impl IdFormat {
    pub fn encode(self, id: SnowflakeId) -> Value {
        match self {
            Self::Number => Value::from(id.to_raw()),
            Self::String => Value::String(id.to_string()),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Wall clock, read on every call.
    System,
    /// Wall clock sampled once, then advanced monotonically.
    Monotonic,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// The generator's time source, chosen at startup.
#[derive(Debug, Clone)]
pub enum Clock {
    System(SystemClock),
    Monotonic(MonotonicClock),
}

impl From<ClockKind> for Clock {
    fn from(kind: ClockKind) -> Self {
        match kind {
            ClockKind::System => Self::System(SystemClock),
            ClockKind::Monotonic => Self::Monotonic(MonotonicClock::new()),
        }
    }
}

impl TimeSource for Clock {
    fn current_millis(&self) -> u64 {
        match self {
            Self::System(clock) => clock.current_millis(),
            Self::Monotonic(clock) => clock.current_millis(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub generator: Config,
    pub column: String,
    pub id_format: IdFormat,
    pub clock: ClockKind,
    pub input: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for FilterConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let column = args.column.trim();
        if column.is_empty() {
            bail!("TARGET_FIELD_NAME must not be empty");
        }

        let generator = Config {
            worker_id: args.worker_id,
            datacenter_id: args.datacenter_id,
            sequence_start: args.sequence_start,
            custom_epoch_ms: args.custom_epoch_ms,
            clock_policy: args.clock_policy,
            lock_scope: args.lock_scope,
        };
        generator
            .validate()
            .context("invalid generator configuration")?;

        Ok(Self {
            generator,
            column: column.to_owned(),
            id_format: args.id_format,
            clock: args.clock,
            input: args.input,
            log_format: args.log_format,
        })
    }
}
