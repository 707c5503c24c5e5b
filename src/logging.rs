//! Structured logging and tracing for sunspec-curtail
//!
//! Console and daily-rolled file output built on `tracing-subscriber`, plus
//! [`StructuredLogger`], a small handle that tags every record with the
//! component and device it came from.

use crate::config::LoggingConfig;
use crate::error::{CurtailError, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod structured;

pub use level::{more_verbose, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

/// Environment variable that forces console-only logging
pub const DISABLE_FILE_LOG_ENV: &str = "SUNSPEC_CURTAIL_DISABLE_FILE_LOG";

/// Prefix of the rolled log files inside the log directory
pub const LOG_FILE_PREFIX: &str = "sunspec-curtail";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Outcome of the one and only initialization, replayed on later calls
static INIT_RESULT: OnceCell<std::result::Result<(), String>> = OnceCell::new();

/// Flushes the file writer when dropped, so it lives for the whole process
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Install the global subscriber; later calls return the first outcome
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_RESULT
        .get_or_init(|| install(config).map_err(|e| e.to_string()))
        .clone()
        .map_err(CurtailError::config)
}

fn install(config: &LoggingConfig) -> Result<()> {
    let base = parse_log_level(&config.level)?;
    let override_or_base = |value: &Option<String>| {
        value
            .as_deref()
            .and_then(|s| parse_log_level(s).ok())
            .unwrap_or(base)
    };
    let console_level = override_or_base(&config.console_level);
    let file_level = override_or_base(&config.file_level);

    let console_only = cfg!(test) || std::env::var_os(DISABLE_FILE_LOG_ENV).is_some();

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_output || console_only {
        layers.push(output_layer(std::io::stdout, config.json_format, true, console_level));
    }
    if !console_only {
        let appender = rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .max_log_files(config.backup_count.max(1) as usize)
            .build(log_directory(&config.file))
            .map_err(|e| CurtailError::io(format!("Failed to create log file appender: {}", e)))?;
        let (writer, guard) = non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(output_layer(writer, config.json_format, false, file_level));
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if console_only {
            console_level
        } else {
            more_verbose(console_level, file_level)
        };
        format!("sunspec_curtail={},tokio_modbus=warn", level).into()
    });

    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    // Under test another subscriber may already own the global slot
    if let Err(e) = installed
        && !console_only
    {
        return Err(CurtailError::config(format!(
            "Failed to install subscriber: {}",
            e
        )));
    }

    tracing::info!(
        console_level = %console_level,
        file_level = %file_level,
        file = if console_only { "-" } else { config.file.as_str() },
        "Logging initialized"
    );
    Ok(())
}

fn output_layer<S, W>(writer: W, json: bool, ansi: bool, level: Level) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(ansi);
    let filter = LevelFilter::from_level(level);
    if json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

/// Directory receiving the rolled files: the parent of a file path, or the path itself
fn log_directory(configured: &str) -> &Path {
    let path = Path::new(configured);
    if path.extension().is_some() {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    } else {
        path
    }
}
