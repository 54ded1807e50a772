use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory receiving one log file per run
    pub dir: PathBuf,
    /// Also write logs to a file under `dir`
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            to_file: true,
        }
    }
}

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Per-run log file name, e.g. `10_17_2026_09_05_33.log`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    started.format("%m_%d_%Y_%H_%M_%S.log").to_string()
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the process-wide subscriber: human-readable stderr plus an optional
/// plain-text file under `config.dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init_tracing(config: &LoggingConfig, verbosity: u8) -> Result<Option<WorkerGuard>> {
    let level = level_for(verbosity);

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter(level));

    let (file_layer, guard) = if config.to_file {
        std::fs::create_dir_all(&config.dir)
            .with_context(|| format!("failed to create log dir {}", config.dir.display()))?;
        let appender = tracing_appender::rolling::never(&config.dir, log_file_name(Local::now()));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter(level));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A subscriber may already be installed (e.g. by a test harness); keep it.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    Ok(guard)
}
