//! SunSpec information model support
//!
//! SunSpec devices expose their data as a chain of numbered blocks (models)
//! in the Modbus holding register space. This module knows which blocks
//! carry the points the controller needs, how those points are encoded,
//! and how to talk to a device through an abstract register transport.

use crate::error::Result;
use std::collections::BTreeSet;

pub mod device;
#[cfg(test)]
pub(crate) mod fake;
pub mod points;
pub mod resolver;

pub use device::{SunSpecConnector, SunSpecDevice};
pub use resolver::{CapabilityProfile, PointRef, Role, resolve};

/// Numeric SunSpec model identifier
pub type ModelId = u16;

/// Single phase inverter
pub const INVERTER_SINGLE_PHASE: ModelId = 101;
/// Split phase inverter
pub const INVERTER_SPLIT_PHASE: ModelId = 102;
/// Three phase inverter
pub const INVERTER_THREE_PHASE: ModelId = 103;
/// Nameplate ratings
pub const NAMEPLATE: ModelId = 120;
/// Immediate controls
pub const IMMEDIATE_CONTROLS: ModelId = 123;
/// DER AC measurement
pub const DER_AC_MEASUREMENT: ModelId = 701;
/// DER capacity
pub const DER_CAPACITY: ModelId = 702;
/// DER AC controls
pub const DER_AC_CONTROLS: ModelId = 704;

/// Point-level access to a connected SunSpec device
///
/// Values are exchanged in engineering units; scale factors are applied by
/// the implementation. Transport failures surface as errors for which
/// [`crate::error::CurtailError::is_transport`] holds.
#[async_trait::async_trait]
pub trait RegisterTransport: Send {
    /// Scan the device and return the set of block ids it exposes
    async fn discover_blocks(&mut self) -> Result<BTreeSet<ModelId>>;

    /// Read one point in engineering units
    async fn read_point(&mut self, block: ModelId, offset: u16) -> Result<f64>;

    /// Write one point given in engineering units
    async fn write_point(&mut self, block: ModelId, offset: u16, value: f64) -> Result<()>;

    /// Release the link before the transport is dropped
    fn close(&mut self) {}
}

/// Factory for fresh device links, used both at setup and on reconnect
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>>;

    /// Human readable target, for logs
    fn describe(&self) -> String {
        "device".to_string()
    }
}
