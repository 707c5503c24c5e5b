//! Modbus TCP client for SunSpec inverter communication
//!
//! Thin async wrapper around `tokio-modbus` that applies the configured
//! timeouts and maps failures onto [`CurtailError`]. Protocol exceptions
//! returned by the device are kept apart from transport failures so callers
//! can tell a rejected request from a dead link.

use crate::config::ModbusConfig;
use crate::error::{CurtailError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Largest register count a single read request may ask for
pub const MAX_READ_REGISTERS: u16 = 125;

/// Holding register access, implemented by [`ModbusClient`] and by test doubles
#[async_trait::async_trait]
pub trait ModbusLike: Send {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;

    async fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()>;

    /// Close the underlying connection; requests fail afterwards
    fn disconnect(&mut self) {}
}

/// Modbus TCP client bound to one unit id
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    /// Configuration
    config: ModbusConfig,

    /// Unit id addressed by every request
    unit_id: u8,

    /// Connection timeout
    connection_timeout: Duration,

    /// Operation timeout
    operation_timeout: Duration,

    /// Logger
    logger: StructuredLogger,
}

impl ModbusClient {
    /// Create a new Modbus client
    pub fn new(config: &ModbusConfig, unit_id: u8) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("modbus").with_device(format!("{}:{}", config.ip, config.port)),
        );
        Self {
            client: None,
            config: config.clone(),
            unit_id,
            connection_timeout: config.connect_timeout(),
            operation_timeout: config.operation_timeout(),
            logger,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Connect to the Modbus server
    pub async fn connect(&mut self) -> Result<()> {
        let socket_addr = Self::resolve_address(self.config.ip.clone(), self.config.port).await?;

        self.logger.info(&format!(
            "Connecting to Modbus server at {} (unit {})",
            socket_addr, self.unit_id
        ));

        match timeout(
            self.connection_timeout,
            tcp::connect_slave(socket_addr, Slave(self.unit_id)),
        )
        .await
        {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Successfully connected to Modbus server");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to Modbus server: {}", e);
                self.logger.error(&error_msg);
                Err(CurtailError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Connection timeout".to_string();
                self.logger.error(&error_msg);
                Err(CurtailError::timeout(error_msg))
            }
        }
    }

    /// Disconnect from the Modbus server
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            self.logger.info("Disconnecting from Modbus server");
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read holding registers
    pub async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(CurtailError::validation(
                "count",
                "register count must be between 1 and 125",
            ));
        }

        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Reading {} registers from address {}",
            count, address
        ));

        let client = self.get_client()?;
        let request = client.read_holding_registers(address, count);

        match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(response))) => {
                self.logger.trace(&format!(
                    "Read {} registers: {:?}",
                    response.len(),
                    response
                ));
                Ok(response)
            }
            Ok(Ok(Err(exception))) => {
                let error_msg = format!(
                    "Device rejected read of {} registers at {}: {:?}",
                    count, address, exception
                );
                self.logger.debug(&error_msg);
                Err(CurtailError::exception(error_msg))
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to read holding registers: {}", e);
                self.logger.error(&error_msg);
                Err(CurtailError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Read operation timeout".to_string();
                self.logger.error(&error_msg);
                Err(CurtailError::timeout(error_msg))
            }
        }
    }

    /// Write multiple registers
    pub async fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        let timeout_duration = self.operation_timeout;

        self.logger.debug(&format!(
            "Writing {:?} to registers starting at {}",
            values, address
        ));

        let client = self.get_client()?;
        let request = client.write_multiple_registers(address, values);

        match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(()))) => {
                self.logger.debug("Successfully wrote multiple registers");
                Ok(())
            }
            Ok(Ok(Err(exception))) => {
                let error_msg = format!(
                    "Device rejected write at {}: {:?}",
                    address, exception
                );
                self.logger.warn(&error_msg);
                Err(CurtailError::exception(error_msg))
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to write multiple registers: {}", e);
                self.logger.error(&error_msg);
                Err(CurtailError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Write operation timeout".to_string();
                self.logger.error(&error_msg);
                Err(CurtailError::timeout(error_msg))
            }
        }
    }

    /// Get client reference or error if not connected
    fn get_client(&mut self) -> Result<&mut tokio_modbus::client::Context> {
        self.client
            .as_mut()
            .ok_or_else(|| CurtailError::modbus("Not connected to Modbus server"))
    }

    async fn resolve_address(host: String, port: u16) -> Result<SocketAddr> {
        let host = host.trim();
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, port));
        }

        let mut addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| CurtailError::modbus(format!("Cannot resolve {}: {}", host, e)))?;
        addrs
            .next()
            .ok_or_else(|| CurtailError::modbus(format!("No address found for {}", host)))
    }
}

#[async_trait::async_trait]
impl ModbusLike for ModbusClient {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        ModbusClient::read_holding_registers(self, address, count).await
    }

    async fn write_multiple_registers(&mut self, address: u16, values: &[u16]) -> Result<()> {
        ModbusClient::write_multiple_registers(self, address, values).await
    }

    fn disconnect(&mut self) {
        ModbusClient::disconnect(self);
    }
}
