#![doc = include_str!("../README.md")]

mod config;
mod error;
mod pipeline;
mod telemetry;

use std::{future::Future, pin::Pin};

use clap::Parser;
use config::{CliArgs, Clock, FilterConfig};
use pipeline::RecordFilter;
use snowflaker::{SnowflakeGenerator, TracingLogger};
use telemetry::init_telemetry;
use tokio::io::{AsyncRead, BufReader, BufWriter};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

type Generator = SnowflakeGenerator<Clock, TracingLogger>;

fn main() -> anyhow::Result<()> {
    block_on_detached(filter_main())?
}

/// Drives `future` on a fresh multi-threaded runtime, then shuts the runtime
/// down without waiting on blocking tasks.
///
/// Tokio's stdin reads on a blocking thread that cannot be cancelled, so a
/// graceful runtime drop would hang until upstream writes or closes.
fn block_on_detached<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

async fn filter_main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = FilterConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let generator: Generator =
        SnowflakeGenerator::try_new(config.generator, config.clock.into(), TracingLogger)?;
    let filter = RecordFilter::new(generator, config.column, config.id_format);

    let reader: Pin<Box<dyn AsyncRead + Send>> = match &config.input {
        Some(path) => Box::pin(tokio::fs::File::open(path).await?),
        None => Box::pin(tokio::io::stdin()),
    };
    let writer = BufWriter::new(tokio::io::stdout());

    let stats = pipeline::run(&filter, BufReader::new(reader), writer, shutdown_signal()).await?;

    tracing::info!(
        stamped = stats.stamped,
        passed_through = stats.passed_through,
        skipped = stats.skipped,
        "Filter finished"
    );
    Ok(())
}

fn log_startup_info(config: &FilterConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting snowflake filter with full config: {:#?}", config);
    } else {
        tracing::info!(
            column = %config.column,
            worker_id = config.generator.worker_id,
            datacenter_id = config.generator.datacenter_id,
            custom_epoch_ms = config.generator.custom_epoch_ms,
            "Starting snowflake filter"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
