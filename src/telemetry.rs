//! External telemetry: injection tariff and grid import/export power
//!
//! The control loop only depends on [`TelemetrySource`]; the Home Assistant
//! REST client is the production implementation.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod home_assistant;

pub use home_assistant::HomeAssistantTelemetry;

/// Raw state of one entity as reported by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryReading {
    /// Numeric value as text, exactly as reported
    pub state: String,
    /// Unit symbol, if the entity carries one
    pub unit: Option<String>,
}

impl TelemetryReading {
    pub fn new<S: Into<String>>(state: S, unit: Option<&str>) -> Self {
        Self {
            state: state.into(),
            unit: unit.map(str::to_string),
        }
    }
}

/// Read access to external entities
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Current reading, `Ok(None)` when the entity does not exist
    async fn get(&self, entity_id: &str) -> Result<Option<TelemetryReading>>;
}
