//! Home Assistant REST API telemetry source

use super::{TelemetryReading, TelemetrySource};
use crate::config::TelemetryConfig;
use crate::error::{CurtailError, Result};
use crate::logging::{StructuredLogger, get_logger};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV: &str = "HA_TOKEN";

#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
    #[serde(default)]
    attributes: EntityAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct EntityAttributes {
    unit_of_measurement: Option<String>,
}

/// Reads entity states from `GET {base_url}/api/states/{entity_id}`
pub struct HomeAssistantTelemetry {
    base_url: String,
    token: String,
    client: Client,
    logger: StructuredLogger,
}

impl HomeAssistantTelemetry {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CurtailError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            logger: get_logger("telemetry"),
        })
    }

    /// Build from configuration, falling back to `HA_TOKEN` for the token
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .ok_or_else(|| {
                CurtailError::config(format!(
                    "Home Assistant token not found in telemetry.token or {}",
                    TOKEN_ENV
                ))
            })?;

        Self::new(
            config.base_url.clone(),
            token,
            Duration::from_millis(config.request_timeout_ms),
        )
    }
}

#[async_trait::async_trait]
impl TelemetrySource for HomeAssistantTelemetry {
    async fn get(&self, entity_id: &str) -> Result<Option<TelemetryReading>> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        self.logger.debug(&format!("GET {}", url));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let entity = response.json::<EntityState>().await?;
                self.logger.trace(&format!(
                    "{} = '{}' {:?}",
                    entity_id, entity.state, entity.attributes.unit_of_measurement
                ));
                Ok(Some(TelemetryReading {
                    state: entity.state,
                    unit: entity.attributes.unit_of_measurement,
                }))
            }
            StatusCode::NOT_FOUND => {
                self.logger
                    .warn(&format!("Entity not found: {}", entity_id));
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CurtailError::telemetry(
                format!("Authentication failed reading {}", entity_id),
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CurtailError::telemetry(format!(
                    "Status {} reading {}: {}",
                    status, entity_id, body
                )))
            }
        }
    }
}
