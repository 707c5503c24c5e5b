use super::types::TickOutcome;
use crate::error::CurtailError;
use crate::setpoint::{
    SetpointInputs, compute_percent, disabled_setpoint, should_write,
};
use std::sync::Arc;

mod inputs;

use inputs::GridReadings;

impl super::CurtailmentDriver {
    /// Single control tick: evaluate, record the outcome and publish
    pub(crate) async fn poll_cycle(&mut self) -> TickOutcome {
        self.logger.debug("Starting poll cycle");
        let outcome = self.evaluate_tick().await;

        self.total_ticks = self.total_ticks.saturating_add(1);
        self.last_outcome = Some(outcome);
        match outcome {
            TickOutcome::Suspended | TickOutcome::Unchanged => {
                self.logger.debug(&format!("Tick outcome: {:?}", outcome));
            }
            TickOutcome::Written | TickOutcome::Reconnecting => {
                self.logger.info(&format!("Tick outcome: {:?}", outcome));
            }
            _ => self.logger.warn(&format!("Tick outcome: {:?}", outcome)),
        }
        self.publish_snapshot();
        outcome
    }

    async fn evaluate_tick(&mut self) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Suspended;
        };
        session.poll_reconnect().await;
        if !session.is_operational() || session.is_sleeping() {
            return TickOutcome::Suspended;
        }
        if !session.is_connected() {
            session.start_reconnect();
            return TickOutcome::Reconnecting;
        }

        let telemetry = Arc::clone(&self.telemetry);
        let Some(grid) =
            inputs::fetch_grid_readings(telemetry.as_ref(), &self.config.telemetry, &self.logger)
                .await
        else {
            return TickOutcome::MissingTelemetry;
        };

        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Suspended;
        };

        let measured = match session.read_measured_power().await {
            Ok(w) => w,
            Err(e) => {
                self.logger
                    .warn(&format!("Reading inverter output failed: {}", e));
                return TickOutcome::DeviceReadFailed;
            }
        };
        self.control.measured_power_w = Some(measured);

        let rated = match session.rated_power_w() {
            Some(r) => r,
            None => match session.refresh_rated_power().await {
                Ok(r) => r,
                Err(e) => {
                    self.logger
                        .warn(&format!("Rated power still unknown: {}", e));
                    return TickOutcome::MissingRating;
                }
            },
        };

        let outcome = self.apply_setpoint(&grid, measured, rated).await;

        self.control.last_import_w = Some(grid.import_w);
        self.control.last_export_w = Some(grid.export_w);
        self.control.last_tariff = Some(grid.tariff);
        outcome
    }

    /// Compute the setpoint for this tick and send it when it changed
    async fn apply_setpoint(&mut self, grid: &GridReadings, measured_w: f64, rated_w: f64) -> TickOutcome {
        let (setpoint_w, percent, reason) = if self.control.enabled {
            let inputs = SetpointInputs {
                tariff: grid.tariff,
                import_w: grid.import_w,
                export_w: grid.export_w,
                pv_w: measured_w,
                rated_w,
                prev_import_w: self.control.last_import_w,
                prev_export_w: self.control.last_export_w,
                prev_setpoint_w: self.control.setpoint_w,
            };
            let (w, reason) = self.engine.compute(&inputs);
            (w, compute_percent(w, rated_w), reason)
        } else {
            disabled_setpoint(rated_w)
        };

        self.control.setpoint_w = Some(setpoint_w);
        self.control.setpoint_percent = Some(percent);
        self.control.setpoint_reason = Some(reason);
        self.logger.debug(&format!(
            "Setpoint {} W ({}%) via {:?}; tariff {}, import {} W, export {} W, output {} W",
            setpoint_w, percent, reason, grid.tariff, grid.import_w, grid.export_w, measured_w
        ));

        if !should_write(setpoint_w, self.control.last_sent_setpoint_w) {
            return TickOutcome::Unchanged;
        }

        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Suspended;
        };
        match session.write_power_limit(percent).await {
            Ok(()) => {
                self.control.last_sent_setpoint_w = Some(setpoint_w);
                self.total_writes = self.total_writes.saturating_add(1);
                self.logger.info(&format!(
                    "Power limit set to {}% ({} W)",
                    percent, setpoint_w
                ));
                TickOutcome::Written
            }
            Err(CurtailError::UnsupportedBrand { brand }) => {
                self.logger.warn(&format!(
                    "Setpoint {} W not sent: no write path for brand '{}'",
                    setpoint_w, brand
                ));
                TickOutcome::UnsupportedBrand
            }
            Err(e) => {
                self.failed_writes = self.failed_writes.saturating_add(1);
                self.logger
                    .error(&format!("Writing power limit failed: {}", e));
                TickOutcome::WriteFailed
            }
        }
    }
}
