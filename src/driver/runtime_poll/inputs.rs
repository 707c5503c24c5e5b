use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::logging::StructuredLogger;
use crate::telemetry::{TelemetryReading, TelemetrySource};
use crate::units::{normalize, parse_number};

/// Telemetry of one tick, normalized
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct GridReadings {
    pub tariff: f64,
    pub import_w: f64,
    pub export_w: f64,
}

async fn fetch(
    source: &dyn TelemetrySource,
    entity_id: &str,
    logger: &StructuredLogger,
) -> Option<TelemetryReading> {
    match source.get(entity_id).await {
        Ok(Some(reading)) => Some(reading),
        Ok(None) => {
            logger.warn(&format!("Telemetry entity {} is absent", entity_id));
            None
        }
        Err(e) => {
            logger.warn(&format!("Telemetry entity {} unreadable: {}", entity_id, e));
            None
        }
    }
}

fn usable(entity_id: &str, value: Result<f64>, logger: &StructuredLogger) -> Option<f64> {
    value
        .map_err(|e| logger.warn(&format!("Telemetry entity {} unusable: {}", entity_id, e)))
        .ok()
}

/// Fetch and normalize tariff, import and export; `None` skips the tick
pub(super) async fn fetch_grid_readings(
    source: &dyn TelemetrySource,
    config: &TelemetryConfig,
    logger: &StructuredLogger,
) -> Option<GridReadings> {
    let tariff = fetch(source, &config.injection_tariff_entity, logger).await;
    let import = fetch(source, &config.import_power_entity, logger).await;
    let export = fetch(source, &config.export_power_entity, logger).await;
    let (tariff, import, export) = (tariff?, import?, export?);

    let tariff = usable(
        &config.injection_tariff_entity,
        parse_number(&tariff.state),
        logger,
    );
    let import_w = usable(
        &config.import_power_entity,
        normalize(&import.state, import.unit.as_deref()),
        logger,
    );
    let export_w = usable(
        &config.export_power_entity,
        normalize(&export.state, export.unit.as_deref()),
        logger,
    );

    Some(GridReadings {
        tariff: tariff?,
        import_w: import_w?,
        export_w: export_w?,
    })
}
