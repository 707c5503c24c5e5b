//! Device session for the SunSpec inverter
//!
//! A session owns the live link to the inverter together with the
//! capability profile resolved at setup. Transport failures discard the
//! link and hand over to a background reconnect task; the control loop
//! harvests the task's result on its next tick.

use crate::brand::InverterBrand;
use crate::error::{CurtailError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::sunspec::{CapabilityProfile, Connector, ModelId, PointRef, RegisterTransport, resolve};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub mod reconnect;

pub use reconnect::{ReconnectOutcome, ReconnectPolicy};

/// Link state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
    /// Reconnected to a device exposing no blocks; needs a restart
    Failed,
}

/// Live link plus resolved profile for one inverter
pub struct DeviceSession {
    connector: Arc<dyn Connector>,
    brand: InverterBrand,
    policy: ReconnectPolicy,
    profile: CapabilityProfile,
    handle: Option<Box<dyn RegisterTransport>>,
    rated_power_w: Option<f64>,
    state: ConnectionState,
    operational: bool,
    sleeping: bool,
    reconnect_task: Option<JoinHandle<ReconnectOutcome>>,
    reconnect_count: u64,
    logger: StructuredLogger,
}

impl DeviceSession {
    /// Connect, discover the device's blocks and resolve the capability profile
    ///
    /// Any failure here is final: the caller is expected to refuse to start.
    /// A rated power that cannot be read is only logged; it is retried by
    /// [`DeviceSession::refresh_rated_power`].
    pub async fn setup(
        connector: Arc<dyn Connector>,
        brand: InverterBrand,
        policy: ReconnectPolicy,
    ) -> Result<Self> {
        let logger = get_logger_with_context(
            LogContext::new("session")
                .with_device(connector.describe())
                .with_field("brand", brand.to_string()),
        );

        logger.info("Setting up device session");
        let mut handle = connector.connect().await?;
        let blocks = handle.discover_blocks().await?;
        let profile = resolve(&blocks)?;
        logger.info(&format!(
            "Resolved profile: measurement {}, control {}, rating {}",
            profile.measurement, profile.control, profile.rating
        ));

        let mut session = Self {
            connector,
            brand,
            policy,
            profile,
            handle: Some(handle),
            rated_power_w: None,
            state: ConnectionState::Connected,
            operational: true,
            sleeping: false,
            reconnect_task: None,
            reconnect_count: 0,
            logger,
        };

        if let Err(e) = session.refresh_rated_power().await {
            session
                .logger
                .warn(&format!("Rated power unavailable at setup: {}", e));
        }

        Ok(session)
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn brand(&self) -> InverterBrand {
        self.brand
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// False once the device turned out to expose no blocks
    pub fn is_operational(&self) -> bool {
        self.operational
    }

    /// True while a reconnect is in progress
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn rated_power_w(&self) -> Option<f64> {
        self.rated_power_w
    }

    /// Number of successful reconnects since setup
    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count
    }

    /// Live read of one point
    ///
    /// A transport failure drops the link and starts the reconnect task
    /// before the error is returned.
    pub async fn read_point(&mut self, block: ModelId, offset: u16) -> Result<f64> {
        let Some(handle) = self.handle.as_mut() else {
            self.start_reconnect();
            return Err(CurtailError::modbus("No connection to device"));
        };
        match handle.read_point(block, offset).await {
            Ok(v) => Ok(v),
            Err(e) => {
                if e.is_transport() {
                    self.on_transport_failure(&e);
                }
                Err(e)
            }
        }
    }

    /// Write a control value in percent through the brand's write strategy
    ///
    /// The point is re-read first. Brands without a write strategy fail with
    /// [`CurtailError::UnsupportedBrand`] and nothing is written.
    pub async fn write_point(&mut self, block: ModelId, offset: u16, percent: f64) -> Result<()> {
        let current = self.read_point(block, offset).await?;
        self.logger.trace(&format!(
            "Control point {}@{} currently {}",
            block, offset, current
        ));

        let value = self.brand.control_value(percent)?;

        let Some(handle) = self.handle.as_mut() else {
            return Err(CurtailError::modbus("No connection to device"));
        };
        match handle.write_point(block, offset, value).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if e.is_transport() {
                    self.on_transport_failure(&e);
                }
                Err(e)
            }
        }
    }

    /// Current AC output in watts
    pub async fn read_measured_power(&mut self) -> Result<f64> {
        let PointRef { block, offset } = self.profile.measurement;
        self.read_point(block, offset).await
    }

    /// Read the rated power and remember it
    pub async fn refresh_rated_power(&mut self) -> Result<f64> {
        let PointRef { block, offset } = self.profile.rating;
        let rated = self.read_point(block, offset).await?;
        if rated <= 0.0 {
            return Err(CurtailError::validation(
                "rated_power".to_string(),
                format!("device reports {} W", rated),
            ));
        }
        self.rated_power_w = Some(rated);
        Ok(rated)
    }

    /// Send a power limit in percent of rated power
    pub async fn write_power_limit(&mut self, percent: f64) -> Result<()> {
        let PointRef { block, offset } = self.profile.control;
        self.write_point(block, offset, percent).await
    }

    fn on_transport_failure(&mut self, error: &CurtailError) {
        self.logger
            .warn(&format!("Device link lost: {}", error));
        self.close_link();
        self.state = ConnectionState::Disconnected;
        self.start_reconnect();
    }

    /// Spawn the reconnect task unless one is already running
    pub fn start_reconnect(&mut self) {
        if !self.operational || self.reconnect_task.is_some() {
            return;
        }
        self.close_link();
        self.state = ConnectionState::Reconnecting;
        self.sleeping = true;
        let connector = Arc::clone(&self.connector);
        self.reconnect_task = Some(tokio::spawn(reconnect::run(connector, self.policy)));
    }

    /// Install the result of a finished reconnect task, if any
    pub async fn poll_reconnect(&mut self) {
        let finished = self
            .reconnect_task
            .as_ref()
            .is_some_and(JoinHandle::is_finished);
        if !finished {
            return;
        }
        let Some(task) = self.reconnect_task.take() else {
            return;
        };

        match task.await {
            Ok(ReconnectOutcome::Connected {
                transport,
                blocks,
                attempts,
            }) => {
                for p in [
                    self.profile.measurement,
                    self.profile.control,
                    self.profile.rating,
                ] {
                    if !blocks.contains(&p.block) {
                        self.logger.warn(&format!(
                            "Block {} from the resolved profile is missing after reconnect",
                            p.block
                        ));
                    }
                }
                self.handle = Some(transport);
                self.state = ConnectionState::Connected;
                self.sleeping = false;
                self.reconnect_count = self.reconnect_count.saturating_add(1);
                self.logger
                    .info(&format!("Device link restored after {} attempt(s)", attempts));
            }
            Ok(ReconnectOutcome::NoBlocks { attempts }) => {
                self.operational = false;
                self.sleeping = false;
                self.state = ConnectionState::Failed;
                self.logger.error(&format!(
                    "Device exposes no blocks after {} reconnect attempt(s); session disabled until restart",
                    attempts
                ));
            }
            Err(e) => {
                self.sleeping = false;
                self.state = ConnectionState::Disconnected;
                self.logger
                    .error(&format!("Reconnect task ended abnormally: {}", e));
            }
        }
    }

    /// Stop any reconnect in progress and drop the link
    pub fn shutdown(&mut self) {
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
        if self.handle.is_some() {
            self.logger.info("Closing device link");
        }
        self.close_link();
        self.state = ConnectionState::Disconnected;
        self.sleeping = false;
    }

    fn close_link(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
    }
}
