use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Where and how the launcher logs
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Directory for the rolling log files
    pub log_dir: Utf8PathBuf,
    /// File name prefix, e.g. `omwlaunch` → `omwlaunch.2026-10-15`
    pub log_prefix: String,
    /// Default to `debug` instead of `info` when `RUST_LOG` is unset
    pub debug_mode: bool,
    /// Mirror logs to stderr with ANSI colors
    pub console_output: bool,
    /// Write the file log as JSON lines
    pub json_output: bool,
}

impl LoggingOptions {
    pub fn new(log_dir: impl Into<Utf8PathBuf>, log_prefix: &str) -> Self {
        Self {
            log_dir: log_dir.into(),
            log_prefix: log_prefix.to_string(),
            debug_mode: false,
            console_output: true,
            json_output: false,
        }
    }

    /// Filter used when `RUST_LOG` is not set
    fn default_directive(&self) -> &'static str {
        if self.debug_mode { "debug" } else { "info" }
    }
}

/// Create the log directory if it is missing
fn ensure_log_dir(options: &LoggingOptions) -> Result<()> {
    if !options.log_dir.exists() {
        fs::create_dir_all(&options.log_dir)
            .with_context(|| format!("Failed to create log directory: {}", options.log_dir))?;
    }
    Ok(())
}

/// Setup logging with a daily rotating file appender and optional console output.
///
/// `RUST_LOG` takes precedence over the debug flag.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(options: &LoggingOptions) -> Result<WorkerGuard> {
    ensure_log_dir(options)?;

    let file_appender = rolling::daily(&options.log_dir, &options.log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_directive()));

    let plain_file_layer = (!options.json_output).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking.clone())
            .with_ansi(false) // No ANSI codes in log files
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let json_file_layer = options.json_output.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking.clone())
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });

    let console_layer = options.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_file_layer)
        .with(json_file_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        options.log_dir,
        options.log_prefix,
        options.debug_mode,
        options.console_output,
        options.json_output
    );

    Ok(guard)
}
