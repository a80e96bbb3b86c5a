use core::future::Future;

use serde_json::Value;
use snowflaker::{IdGenerator, IdGeneratorAsyncTokioExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{config::IdFormat, error::FilterError};

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A JSON object, re-serialized with the ID field set.
    Stamped(String),
    /// Anything else, forwarded byte for byte.
    PassedThrough(Vec<u8>),
    /// A blank line, dropped.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub stamped: u64,
    pub passed_through: u64,
    pub skipped: u64,
}

impl Stats {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Stamped(_) => self.stamped += 1,
            Outcome::PassedThrough(_) => self.passed_through += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Stamps IDs from a single generator onto records.
pub struct RecordFilter<G> {
    generator: G,
    column: String,
    id_format: IdFormat,
}

impl<G> RecordFilter<G>
where
    G: IdGenerator + Sync,
{
    pub fn new(generator: G, column: impl Into<String>, id_format: IdFormat) -> Self {
        Self {
            generator,
            column: column.into(),
            id_format,
        }
    }

    /// Processes one line of input, without its line terminator.
    ///
    /// Only JSON objects consume an ID. Lines that are not valid UTF-8 are
    /// forwarded like any other malformed record.
    pub async fn process_line(&self, line: &[u8]) -> Result<Outcome, FilterError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(Outcome::Skipped);
        }

        match serde_json::from_slice::<Value>(line) {
            Ok(Value::Object(mut record)) => {
                let id = self.generator.next_id_async().await?;
                record.insert(self.column.clone(), self.id_format.encode(id));
                Ok(Outcome::Stamped(serde_json::to_string(&record)?))
            }
            Ok(other) => {
                tracing::warn!(
                    kind = json_kind(&other),
                    "record is not a JSON object, forwarding unchanged"
                );
                Ok(Outcome::PassedThrough(line.to_vec()))
            }
            Err(err) => {
                tracing::warn!(error = %err, "record is not valid JSON, forwarding unchanged");
                Ok(Outcome::PassedThrough(line.to_vec()))
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strips a trailing `\n` or `\r\n`.
fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
    }
    line
}

/// Copies records from `reader` to `writer`, one per line, until the input
/// ends or `shutdown` resolves.
///
/// The writer is flushed before returning, on every path.
///
/// # Errors
///
/// Stops at the first I/O, generator or serialization error. Records written
/// before the error stay written.
pub async fn run<G, R, W>(
    filter: &RecordFilter<G>,
    reader: R,
    mut writer: W,
    shutdown: impl Future<Output = ()>,
) -> Result<Stats, FilterError>
where
    G: IdGenerator + Sync,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = copy_records(filter, reader, &mut writer, shutdown).await;
    let flushed = writer.flush().await;
    let stats = copied?;
    flushed?;
    Ok(stats)
}

async fn copy_records<G, R, W>(
    filter: &RecordFilter<G>,
    mut reader: R,
    writer: &mut W,
    shutdown: impl Future<Output = ()>,
) -> Result<Stats, FilterError>
where
    G: IdGenerator + Sync,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = Stats::default();
    let mut buf = Vec::new();
    tokio::pin!(shutdown);

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping after the current record");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            break;
        }

        let outcome = filter.process_line(trim_line_ending(&buf)).await?;
        stats.record(&outcome);
        match outcome {
            Outcome::Stamped(out) => {
                writer.write_all(out.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            Outcome::PassedThrough(out) => {
                writer.write_all(&out).await?;
                writer.write_all(b"\n").await?;
            }
            Outcome::Skipped => {}
        }
    }

    Ok(stats)
}
