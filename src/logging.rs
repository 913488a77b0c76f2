//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! The bot (`start`) logs JSON to a daily file and text to stderr. One-shot
//! subcommands (`check`, `search`) only write terse text to stderr, which
//! keeps their stdout clean for results.

use std::path::Path;

use anyhow::Context;
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Rolling log file prefix; files are named `plexgram.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "plexgram.log";

/// Filter used when `RUST_LOG` is unset. Long-polling makes the HTTP stack
/// chatty at `info`.
const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,teloxide=warn";

/// Keeps the file writer alive; dropping it flushes pending entries.
#[must_use = "file logging stops when the guard is dropped"]
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn console_layer<S>(with_target: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(with_target)
}

/// Initialise logging for the running bot.
///
/// Both layers honour `RUST_LOG`; without it the bot logs at `info` and the
/// HTTP and Telegram crates at `warn`.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().with_writer(file_writer))
        .with(console_layer(true))
        .try_init()
        .context("global tracing subscriber already installed")?;

    info!(logs_dir = %logs_dir.display(), "file logging enabled");
    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging for one-shot subcommands.
///
/// A second call is a no-op.
pub fn init_cli() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer(false))
        .try_init();
}
