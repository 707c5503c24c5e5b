use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Where a log record comes from
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Component name, e.g. "driver", "session" or "telemetry"
    pub component: String,
    /// Device the component talks to
    pub device: Option<String>,
    pub extra_fields: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            device: None,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn with_device(mut self, device: String) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

macro_rules! level_method {
    ($name:ident, $macro:ident) => {
        pub fn $name(&self, message: &str) {
            tracing::$macro!(
                component = %self.context.component,
                device = self.context.device.as_deref().unwrap_or("-"),
                extra = %self.extra,
                "{}",
                message
            );
        }
    };
}

/// Logger bound to one [`LogContext`]
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context: LogContext,
    /// `key=value` pairs rendered once at construction
    extra: String,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        let mut extra = String::new();
        for (key, value) in &context.extra_fields {
            if !extra.is_empty() {
                extra.push(',');
            }
            let _ = write!(extra, "{}={}", key, value);
        }
        Self { context, extra }
    }

    pub fn context(&self) -> &LogContext {
        &self.context
    }

    level_method!(trace, trace);
    level_method!(debug, debug);
    level_method!(info, info);
    level_method!(warn, warn);
    level_method!(error, error);
}

/// Logger for a component without further context
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}
