//! Core driver logic for sunspec-curtail
//!
//! The driver owns the device session and the control state and runs the
//! control loop: one tick per poll interval, serialized with external
//! commands on a single task. Results are published as a
//! [`DriverSnapshot`] over a `watch` channel so readers never block a tick.

use crate::config::Config;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::session::{DeviceSession, ReconnectPolicy};
use crate::setpoint::SetpointEngine;
use crate::sunspec::Connector;
use crate::telemetry::TelemetrySource;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};

mod commands;
mod runtime_poll;
mod snapshot;
pub mod types;

pub use types::{ControlState, DriverCommand, DriverSnapshot, DriverState, TickOutcome};

/// Price-aware curtailment controller for one inverter
pub struct CurtailmentDriver {
    /// Configuration
    config: Config,

    /// Device session, present once setup succeeded
    session: Option<DeviceSession>,

    /// Opens device links
    connector: Arc<dyn Connector>,

    /// Tariff and grid meter readings
    telemetry: Arc<dyn TelemetrySource>,

    engine: SetpointEngine,

    control: ControlState,

    /// Current driver state
    state: watch::Sender<DriverState>,

    /// Logger with context
    logger: StructuredLogger,

    /// Shutdown signal
    shutdown_tx: mpsc::UnboundedSender<()>,

    /// Shutdown receiver
    shutdown_rx: mpsc::UnboundedReceiver<()>,

    /// Command receiver for external control
    commands_rx: mpsc::UnboundedReceiver<DriverCommand>,

    status_snapshot_tx: watch::Sender<Arc<DriverSnapshot>>,
    status_snapshot_rx: watch::Receiver<Arc<DriverSnapshot>>,

    total_ticks: u64,
    total_writes: u64,
    failed_writes: u64,
    last_outcome: Option<TickOutcome>,
}

impl CurtailmentDriver {
    /// Create a new driver instance; no I/O happens until [`Self::setup`]
    pub fn new(
        config: Config,
        connector: Arc<dyn Connector>,
        telemetry: Arc<dyn TelemetrySource>,
        commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("driver").with_device(connector.describe()),
        );
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(DriverState::Initializing);

        let engine = SetpointEngine::new(
            config.control.cutoff_tariff,
            config.control.import_threshold_watts,
        );
        let control = ControlState {
            enabled: config.control.start_enabled,
            ..ControlState::default()
        };

        let (status_snapshot_tx, status_snapshot_rx) =
            watch::channel(Arc::new(DriverSnapshot::initial(&config)));

        let driver = Self {
            config,
            session: None,
            connector,
            telemetry,
            engine,
            control,
            state: state_tx,
            logger,
            shutdown_tx,
            shutdown_rx,
            commands_rx,
            status_snapshot_tx,
            status_snapshot_rx,
            total_ticks: 0,
            total_writes: 0,
            failed_writes: 0,
            last_outcome: None,
        };
        driver.publish_snapshot();
        driver
    }

    /// Connect to the inverter and resolve its capabilities
    ///
    /// Errors are final; the caller should not start the loop after one.
    pub async fn setup(&mut self) -> Result<()> {
        self.logger.info("Setting up inverter");
        let policy = ReconnectPolicy::from(&self.config.reconnect);
        match DeviceSession::setup(
            Arc::clone(&self.connector),
            self.config.inverter.brand,
            policy,
        )
        .await
        {
            Ok(session) => {
                self.session = Some(session);
                self.publish_snapshot();
                Ok(())
            }
            Err(e) => {
                self.logger.error(&format!("Inverter setup failed: {}", e));
                self.state.send_replace(DriverState::Error(e.to_string()));
                self.publish_snapshot();
                Err(e)
            }
        }
    }

    /// Run the driver main loop until a shutdown signal arrives
    pub async fn run(&mut self) -> Result<()> {
        if self.session.is_none() {
            self.setup().await?;
        }

        self.logger.info(&format!(
            "Starting control loop (every {}s, cutoff tariff {})",
            self.config.control.poll_interval_seconds,
            self.engine.cutoff_tariff()
        ));
        self.state.send_replace(DriverState::Running);
        self.publish_snapshot();

        let mut poll_interval = interval(self.config.control.poll_interval());
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    self.poll_cycle().await;
                }
                Some(cmd) = self.commands_rx.recv() => {
                    self.handle_command(cmd);
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        // Shutdown sequence
        self.state.send_replace(DriverState::ShuttingDown);
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.shutdown();
        }
        self.publish_snapshot();
        self.logger.info("Driver stopped");
    }

    /// Sender that stops [`Self::run`]
    pub fn get_shutdown_sender(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn session(&self) -> Option<&DeviceSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
