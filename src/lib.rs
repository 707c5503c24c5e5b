//! # sunspec-curtail - Price-aware curtailment for SunSpec inverters
//!
//! Limits the AC output of a grid-tied solar inverter whenever the energy
//! injection tariff drops below a cutoff, so that the household stops
//! exporting at a loss while still covering its own consumption.
//!
//! ## Architecture
//!
//! - `units`: Conversion of tagged power readings to watts
//! - `sunspec`: Register map discovery and capability resolution
//! - `setpoint`: Pure setpoint computation
//! - `session`: Device session with backoff reconnect
//! - `driver`: Control loop and published outputs
//! - `telemetry`: Tariff and grid meter readings (Home Assistant)
//! - `web`: HTTP surface for outputs and the enable switch
//! - `config`, `logging`, `error`: Ambient plumbing

pub mod brand;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod session;
pub mod setpoint;
pub mod sunspec;
pub mod telemetry;
pub mod units;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use brand::InverterBrand;
pub use config::Config;
pub use driver::{CurtailmentDriver, DriverCommand, DriverSnapshot};
pub use error::{CurtailError, Result};
