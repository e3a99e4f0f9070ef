//! Console and daily-file tracing setup.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use sc_core::config::{Config, LOG_FILE_PREFIX};

/// Crates whose level follows the configured log level.
const CRATES: &[&str] = &["silkcast", "sc_core", "sc_av", "sc_server"];

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: &str, debug: bool) -> String {
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    directives.push(format!("tower_http={}", if debug { "debug" } else { "info" }));
    directives.join(",")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let log_dir = &config.storage.log_dir;
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let appender = Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("failed to open log file in {}", log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::try_new(directives).context("invalid RUST_LOG")?,
        Err(_) => EnvFilter::try_new(default_directives(
            config.logging.filter_level(),
            config.server.debug,
        ))
        .context("invalid log level")?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(config.logging.color))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
