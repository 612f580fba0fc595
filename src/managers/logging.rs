//! Logging setup: one daily log file plus a stderr console
//!
//! `RUST_LOG`, when set, overrides both filters.

use crate::config::{expand_tilde, GlobalConfig};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "bcupper";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// Level of the file log; the console shows INFO and above
    pub log_level: Level,
    /// Daily files kept before the oldest is pruned
    pub max_files: usize,
}

impl LoggingConfig {
    /// Unknown level names fall back to INFO
    pub fn from_global(global: &GlobalConfig) -> Self {
        let log_level = match global.log_level.to_lowercase().as_str() {
            "warning" => Level::WARN,
            other => other.parse().unwrap_or(Level::INFO),
        };

        Self {
            log_directory: expand_tilde(&global.log_directory),
            log_level,
            max_files: global.log_max_files.max(1) as usize,
        }
    }
}

/// Daily `bcupper.<date>.log` appender that prunes beyond `max_files`
fn file_appender(log_dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files)
        .build(log_dir)
        .with_context(|| format!("Failed to open log file in {:?}", log_dir))
}

/// Install the file and console layers
///
/// Keep the returned guard alive until exit; dropping it flushes the file.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let (writer, file_guard) =
        tracing_appender::non_blocking(file_appender(&config.log_directory, config.max_files)?);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(config.log_level)),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(env_filter(Level::INFO)),
        )
        .init();

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Console-only logging, used before a config has been loaded
pub fn init_console_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(Level::INFO))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

pub struct LogGuard {
    _file_guard: WorkerGuard,
}
