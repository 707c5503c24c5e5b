use super::CurtailmentDriver;
use super::types::{DriverSnapshot, DriverState};
use crate::config::Config;
use std::sync::Arc;

impl DriverSnapshot {
    /// Snapshot before setup: nothing measured or computed yet
    pub fn initial(config: &Config) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            driver_state: format!("{:?}", DriverState::Initializing),
            connection_state: None,
            operational: false,
            sleeping: false,
            enabled: config.control.start_enabled,
            measured_power_w: None,
            setpoint_w: None,
            setpoint_percent: None,
            setpoint_reason: None,
            last_sent_setpoint_w: None,
            rated_power_w: None,
            last_import_w: None,
            last_export_w: None,
            last_tariff: None,
            cutoff_tariff: config.control.cutoff_tariff,
            profile: None,
            total_ticks: 0,
            total_writes: 0,
            failed_writes: 0,
            reconnects: 0,
            last_outcome: None,
            poll_interval_seconds: config.control.poll_interval_seconds,
        }
    }
}

impl CurtailmentDriver {
    pub fn subscribe_snapshot(&self) -> tokio::sync::watch::Receiver<Arc<DriverSnapshot>> {
        self.status_snapshot_rx.clone()
    }

    pub(super) fn build_typed_snapshot(&self) -> DriverSnapshot {
        let session = self.session.as_ref();
        let c = &self.control;
        DriverSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            driver_state: format!("{:?}", *self.state.borrow()),
            connection_state: session.map(crate::session::DeviceSession::state),
            operational: session.is_some_and(crate::session::DeviceSession::is_operational),
            sleeping: session.is_some_and(crate::session::DeviceSession::is_sleeping),
            enabled: c.enabled,
            measured_power_w: c.measured_power_w,
            setpoint_w: c.setpoint_w,
            setpoint_percent: c.setpoint_percent,
            setpoint_reason: c.setpoint_reason,
            last_sent_setpoint_w: c.last_sent_setpoint_w,
            rated_power_w: session.and_then(crate::session::DeviceSession::rated_power_w),
            last_import_w: c.last_import_w,
            last_export_w: c.last_export_w,
            last_tariff: c.last_tariff,
            cutoff_tariff: self.engine.cutoff_tariff(),
            profile: session.map(|s| *s.profile()),
            total_ticks: self.total_ticks,
            total_writes: self.total_writes,
            failed_writes: self.failed_writes,
            reconnects: session.map_or(0, crate::session::DeviceSession::reconnect_count),
            last_outcome: self.last_outcome,
            poll_interval_seconds: self.config.control.poll_interval_seconds,
        }
    }

    /// Replace the published snapshot with the current state
    pub(super) fn publish_snapshot(&self) {
        self.status_snapshot_tx
            .send_replace(Arc::new(self.build_typed_snapshot()));
    }
}
