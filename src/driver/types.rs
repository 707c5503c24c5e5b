use crate::session::ConnectionState;
use crate::setpoint::SetpointReason;
use crate::sunspec::CapabilityProfile;
use serde::Serialize;

/// Main driver state
#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is running normally
    Running,
    /// Driver is in error state
    Error(String),
    /// Driver is shutting down
    ShuttingDown,
}

/// Commands accepted by the driver from external components (web, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    /// Flip the curtailment switch
    SetEnabled(bool),
}

/// What a single tick ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Session not operational or reconnecting
    Suspended,
    /// No link; reconnect started
    Reconnecting,
    /// A telemetry value was absent or unusable
    MissingTelemetry,
    /// Measured power could not be read from the device
    DeviceReadFailed,
    /// Rated power still unknown
    MissingRating,
    /// Setpoint equals the last one sent
    Unchanged,
    Written,
    WriteFailed,
    /// Setpoint computed but the brand has no write path
    UnsupportedBrand,
}

/// Values the control loop carries from one tick to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    pub enabled: bool,
    pub setpoint_w: Option<f64>,
    pub setpoint_percent: Option<f64>,
    pub setpoint_reason: Option<SetpointReason>,
    pub last_sent_setpoint_w: Option<f64>,
    pub last_import_w: Option<f64>,
    pub last_export_w: Option<f64>,
    pub last_tariff: Option<f64>,
    pub measured_power_w: Option<f64>,
}

/// Published view of the driver, read by the web layer
#[derive(Debug, Clone, Serialize)]
pub struct DriverSnapshot {
    pub timestamp: String,
    /// Driver state (Initializing, Running, Error, ShuttingDown)
    pub driver_state: String,
    pub connection_state: Option<ConnectionState>,
    pub operational: bool,
    pub sleeping: bool,
    pub enabled: bool,
    pub measured_power_w: Option<f64>,
    pub setpoint_w: Option<f64>,
    pub setpoint_percent: Option<f64>,
    pub setpoint_reason: Option<SetpointReason>,
    pub last_sent_setpoint_w: Option<f64>,
    pub rated_power_w: Option<f64>,
    pub last_import_w: Option<f64>,
    pub last_export_w: Option<f64>,
    pub last_tariff: Option<f64>,
    pub cutoff_tariff: f64,
    pub profile: Option<CapabilityProfile>,
    pub total_ticks: u64,
    pub total_writes: u64,
    pub failed_writes: u64,
    pub reconnects: u64,
    pub last_outcome: Option<TickOutcome>,
    pub poll_interval_seconds: u64,
}
