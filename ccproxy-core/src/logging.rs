//! Tracing setup for the service and the one-shot CLI commands
//!
//! Events always go to a daily-rolled file next to [`Config::log_path`]
//! (`~/.local/state/ccproxy/ccproxy.log.YYYY-MM-DD`). Interactive runs also
//! get a compact stderr layer. `RUST_LOG` overrides the configured level.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes the file writer.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let (log_dir, file_prefix) = log_target()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = config
        .stderr
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        stderr = config.stderr,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Route events to the test harness's captured output.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes the non-blocking file writer on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Directory and rolling file prefix derived from [`Config::log_path`].
fn log_target() -> Result<(PathBuf, OsString)> {
    let log_path = Config::log_path();
    match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(name)) => Ok((dir.to_path_buf(), name.to_os_string())),
        _ => Err(Error::Config(format!("invalid log path {:?}", log_path))),
    }
}
