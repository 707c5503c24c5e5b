//! SunSpec device access over Modbus holding registers

use super::points::{apply_scale, decode_scale_factor, decode_value, encode_value, point_spec};
use super::{Connector, ModelId, RegisterTransport};
use crate::config::ModbusConfig;
use crate::error::{CurtailError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger, get_logger_with_context};
use crate::modbus::{ModbusClient, ModbusLike};
use std::collections::{BTreeMap, BTreeSet};

/// "SunS" in two big-endian registers
pub const SUNSPEC_MARKER: [u16; 2] = [0x5375, 0x6E53];

/// Register addresses searched for the marker, in order
pub const BASE_ADDRESSES: [u16; 3] = [40000, 0, 50000];

/// Model id closing the model chain
pub const END_MODEL_ID: u16 = 0xFFFF;

/// Upper bound on walked model headers
const MAX_MODELS: usize = 64;

/// Where a model sits in the register space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLocation {
    pub id: ModelId,
    /// Address of the model's ID register
    pub start: u16,
    /// Model length `L`, excluding the two header registers
    pub length: u16,
}

impl ModelLocation {
    fn address_of(&self, offset: u16) -> Option<u16> {
        if offset >= self.length.saturating_add(2) {
            return None;
        }
        self.start.checked_add(offset)
    }
}

/// A SunSpec device reached through a register bus
pub struct SunSpecDevice {
    bus: Box<dyn ModbusLike>,
    models: BTreeMap<ModelId, ModelLocation>,
    logger: StructuredLogger,
}

impl SunSpecDevice {
    pub fn new(bus: Box<dyn ModbusLike>) -> Self {
        Self {
            bus,
            models: BTreeMap::new(),
            logger: get_logger("sunspec"),
        }
    }

    /// Models found by the last scan, first instance per id
    pub fn models(&self) -> &BTreeMap<ModelId, ModelLocation> {
        &self.models
    }

    async fn find_base(&mut self) -> Result<Option<u16>> {
        for base in BASE_ADDRESSES {
            match self.bus.read_holding_registers(base, 2).await {
                Ok(regs) if regs.as_slice() == SUNSPEC_MARKER => return Ok(Some(base)),
                Ok(_) => {}
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => self
                    .logger
                    .debug(&format!("No SunSpec marker at {}: {}", base, e)),
            }
        }
        Ok(None)
    }

    async fn scan(&mut self) -> Result<()> {
        self.models.clear();

        let Some(base) = self.find_base().await? else {
            self.logger.warn("SunSpec marker not found at any base address");
            return Ok(());
        };

        let mut address = base + 2;
        for _ in 0..MAX_MODELS {
            let header = match self.bus.read_holding_registers(address, 2).await {
                Ok(h) if h.len() == 2 => h,
                Ok(_) => break,
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => {
                    self.logger.warn(&format!(
                        "Model chain ends unexpectedly at {}: {}",
                        address, e
                    ));
                    break;
                }
            };
            let (id, length) = (header[0], header[1]);
            if id == END_MODEL_ID {
                break;
            }
            self.models.entry(id).or_insert(ModelLocation {
                id,
                start: address,
                length,
            });
            match address.checked_add(2).and_then(|a| a.checked_add(length)) {
                Some(next) => address = next,
                None => break,
            }
        }

        self.logger.info(&format!(
            "Discovered SunSpec models at base {}: {:?}",
            base,
            self.models.keys().collect::<Vec<_>>()
        ));
        Ok(())
    }

    async fn read_register(&mut self, address: u16) -> Result<u16> {
        let regs = self.bus.read_holding_registers(address, 1).await?;
        regs.first()
            .copied()
            .ok_or_else(|| CurtailError::exception(format!("Empty response at {}", address)))
    }

    /// Register addresses of a point and of its scale factor
    fn locate(&self, block: ModelId, offset: u16) -> Result<(u16, u16, super::points::PointSpec)> {
        let not_found = || CurtailError::point_not_found(block, offset);
        let model = self.models.get(&block).ok_or_else(not_found)?;
        let spec = point_spec(block, offset).ok_or_else(not_found)?;
        let value_addr = model.address_of(offset).ok_or_else(not_found)?;
        let sf_addr = model.address_of(spec.sf_offset).ok_or_else(not_found)?;
        Ok((value_addr, sf_addr, spec))
    }

    async fn read_scale_factor(&mut self, block: ModelId, offset: u16, address: u16) -> Result<i32> {
        let raw = self.read_register(address).await?;
        decode_scale_factor(raw).ok_or_else(|| CurtailError::point_unavailable(block, offset))
    }
}

#[async_trait::async_trait]
impl RegisterTransport for SunSpecDevice {
    async fn discover_blocks(&mut self) -> Result<BTreeSet<ModelId>> {
        self.scan().await?;
        Ok(self.models.keys().copied().collect())
    }

    async fn read_point(&mut self, block: ModelId, offset: u16) -> Result<f64> {
        let (value_addr, sf_addr, spec) = self.locate(block, offset)?;
        let raw = self.read_register(value_addr).await?;
        let value =
            decode_value(spec.kind, raw).ok_or_else(|| CurtailError::point_unavailable(block, offset))?;
        let sf = self.read_scale_factor(block, offset, sf_addr).await?;
        Ok(apply_scale(value, sf))
    }

    async fn write_point(&mut self, block: ModelId, offset: u16, value: f64) -> Result<()> {
        let (value_addr, sf_addr, spec) = self.locate(block, offset)?;
        let sf = self.read_scale_factor(block, offset, sf_addr).await?;
        let raw = encode_value(spec.kind, value, sf)?;
        self.logger.debug(&format!(
            "Writing {} (raw {}) to block {} offset {}",
            value, raw, block, offset
        ));
        self.bus.write_multiple_registers(value_addr, &[raw]).await
    }

    fn close(&mut self) {
        self.models.clear();
        self.bus.disconnect();
    }
}

/// Opens Modbus TCP links to one configured inverter
pub struct SunSpecConnector {
    config: ModbusConfig,
    unit_id: u8,
    logger: StructuredLogger,
}

impl SunSpecConnector {
    pub fn new(config: &ModbusConfig, unit_id: u8) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("connector").with_field("unit_id", unit_id.to_string()),
        );
        Self {
            config: config.clone(),
            unit_id,
            logger,
        }
    }
}

#[async_trait::async_trait]
impl Connector for SunSpecConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>> {
        let mut client = ModbusClient::new(&self.config, self.unit_id);
        client.connect().await?;
        self.logger.debug(&format!("Link open to {}", self.describe()));
        Ok(Box::new(SunSpecDevice::new(Box::new(client))))
    }

    fn describe(&self) -> String {
        format!(
            "{}:{} unit {}",
            self.config.ip, self.config.port, self.unit_id
        )
    }
}
