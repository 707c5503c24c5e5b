use crate::error::{CurtailError, Result};
use tracing::Level;

/// Parse a level name, accepting the `WARNING` and `CRITICAL` aliases
pub fn parse_log_level(level_str: &str) -> Result<Level> {
    let name = level_str.trim().to_ascii_uppercase();
    let canonical = match name.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };
    match canonical {
        "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR" => canonical
            .parse()
            .map_err(|_| CurtailError::config(format!("Invalid log level: {}", level_str))),
        _ => Err(CurtailError::config(format!(
            "Invalid log level: {}",
            level_str
        ))),
    }
}

/// The more verbose of two levels; `tracing` orders TRACE above ERROR
pub fn more_verbose(a: Level, b: Level) -> Level {
    a.max(b)
}
