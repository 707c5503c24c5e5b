//! Configuration management for sunspec-curtail
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::brand::InverterBrand;
use crate::error::{CurtailError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "SUNSPEC_CURTAIL_CONFIG";

fn default_true() -> bool {
    true
}

fn default_modbus_port() -> u16 {
    502
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_operation_timeout_ms() -> u64 {
    2000
}

fn default_base_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Modbus TCP connection to the inverter
    pub modbus: ModbusConfig,

    /// Inverter identity
    pub inverter: InverterConfig,

    /// External telemetry sources (tariff, grid import, grid export)
    pub telemetry: TelemetryConfig,

    /// Control loop tuning
    #[serde(default)]
    pub control: ControlConfig,

    /// Reconnect backoff after a lost device link
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Web server binding configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// IP address or host name of the inverter
    pub ip: String,

    /// TCP port (typically 502)
    #[serde(default = "default_modbus_port")]
    pub port: u16,

    /// Modbus unit id; falls back to the brand default when absent
    #[serde(default)]
    pub unit_id: Option<u8>,

    /// Timeout for establishing the TCP connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Timeout for a single register read or write
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

/// Inverter identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InverterConfig {
    /// Brand, selects the write strategy and default unit id
    pub brand: InverterBrand,
}

/// Telemetry source configuration (Home Assistant REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Base URL of the Home Assistant instance
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Long-lived access token; `HA_TOKEN` is used when absent
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Entity carrying the injection tariff
    pub injection_tariff_entity: String,

    /// Entity carrying grid import power
    pub import_power_entity: String,

    /// Entity carrying grid export power
    pub export_power_entity: String,

    /// HTTP request timeout
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Control loop tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Seconds between two ticks of the control loop
    pub poll_interval_seconds: u64,

    /// Injection tariff at or above which no curtailment happens
    pub cutoff_tariff: f64,

    /// Grid import above this many watts counts as importing
    pub import_threshold_watts: f64,

    /// Whether curtailment is switched on at startup
    pub start_enabled: bool,
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Wait before each of the first `short_attempts` reconnect attempts
    pub short_delay_seconds: u64,

    /// Wait before every later attempt
    pub long_delay_seconds: u64,

    /// Number of attempts using the short delay
    pub short_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Console level override
    pub console_level: Option<String>,

    /// File level override
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the HTTP surface is started
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl ModbusConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl ControlConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first location that exists
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }

        let default_paths = [
            "sunspec_curtail.yaml",
            "/data/sunspec_curtail.yaml",
            "/etc/sunspec-curtail/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Err(CurtailError::config(format!(
            "no configuration file found; set {} or create one of {:?}",
            CONFIG_PATH_ENV, default_paths
        )))
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Modbus unit id, taking the brand default when none is configured
    pub fn unit_id(&self) -> u8 {
        self.modbus
            .unit_id
            .unwrap_or_else(|| self.inverter.brand.default_unit_id())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.modbus.ip.trim().is_empty() {
            return Err(CurtailError::validation(
                "modbus.ip",
                "IP address cannot be empty",
            ));
        }

        if self.modbus.port == 0 {
            return Err(CurtailError::validation(
                "modbus.port",
                "Port must be greater than 0",
            ));
        }

        for (field, entity) in [
            (
                "telemetry.injection_tariff_entity",
                &self.telemetry.injection_tariff_entity,
            ),
            (
                "telemetry.import_power_entity",
                &self.telemetry.import_power_entity,
            ),
            (
                "telemetry.export_power_entity",
                &self.telemetry.export_power_entity,
            ),
        ] {
            if entity.trim().is_empty() {
                return Err(CurtailError::validation(field, "Entity id cannot be empty"));
            }
        }

        if self.control.poll_interval_seconds == 0 {
            return Err(CurtailError::validation(
                "control.poll_interval_seconds",
                "Must be greater than 0",
            ));
        }

        if !self.control.cutoff_tariff.is_finite() {
            return Err(CurtailError::validation(
                "control.cutoff_tariff",
                "Must be a finite number",
            ));
        }

        if !self.control.import_threshold_watts.is_finite()
            || self.control.import_threshold_watts < 0.0
        {
            return Err(CurtailError::validation(
                "control.import_threshold_watts",
                "Must be a non-negative number",
            ));
        }

        if self.reconnect.short_delay_seconds == 0 || self.reconnect.long_delay_seconds == 0 {
            return Err(CurtailError::validation(
                "reconnect",
                "Reconnect delays must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
modbus:
  ip: 192.168.1.170
inverter:
  brand: sma
telemetry:
  injection_tariff_entity: sensor.injection_tariff
  import_power_entity: sensor.power_consumption
  export_power_entity: sensor.power_production
"#;

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        assert_eq!(config.modbus.port, 502);
        assert_eq!(config.unit_id(), 126);
        assert_eq!(config.control.poll_interval_seconds, 10);
        assert!((config.control.cutoff_tariff - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.reconnect.short_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_required_section_fails() {
        let yaml = "modbus:\n  ip: 10.0.0.2\ninverter:\n  brand: sma\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_unknown_brand_fails() {
        let yaml = MINIMAL.replace("brand: sma", "brand: growatt");
        assert!(serde_yaml::from_str::<Config>(&yaml).is_err());
    }

    #[test]
    fn test_explicit_unit_id_wins() {
        let mut config: Config = serde_yaml::from_str(MINIMAL).unwrap();
        config.modbus.unit_id = Some(3);
        assert_eq!(config.unit_id(), 3);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.telemetry.injection_tariff_entity = "sensor.tariff".into();
        config.telemetry.import_power_entity = "sensor.import".into();
        config.telemetry.export_power_entity = "sensor.export".into();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.control.poll_interval_seconds = 0;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.control.cutoff_tariff = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.telemetry.export_power_entity = " ".into();
        assert!(bad.validate().is_err());
    }
}
