//! Inverter brands and how each one accepts a power limit

use crate::error::{CurtailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported inverter brands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InverterBrand {
    /// SMA Sunny Boy / Tripower
    Sma,

    /// SolarEdge HD-Wave / SE-K
    SolarEdge,
}

/// How a brand expects the active power limit to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Write the limit as percent of rated power into the control point
    LimitPercent,

    /// No write path is known for this brand
    Unsupported,
}

impl InverterBrand {
    /// All known brands, in display order
    pub const ALL: [InverterBrand; 2] = [InverterBrand::Sma, InverterBrand::SolarEdge];

    /// Lowercase identifier used in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            InverterBrand::Sma => "sma",
            InverterBrand::SolarEdge => "solaredge",
        }
    }

    /// Modbus unit id the brand answers SunSpec requests on out of the box
    pub fn default_unit_id(self) -> u8 {
        match self {
            InverterBrand::Sma => 126,
            InverterBrand::SolarEdge => 1,
        }
    }

    pub fn write_strategy(self) -> WriteStrategy {
        match self {
            InverterBrand::Sma => WriteStrategy::LimitPercent,
            InverterBrand::SolarEdge => WriteStrategy::Unsupported,
        }
    }

    /// Map a setpoint in percent to the value written to the control point
    pub fn control_value(self, setpoint_percent: f64) -> Result<f64> {
        match self.write_strategy() {
            WriteStrategy::LimitPercent => Ok(setpoint_percent),
            WriteStrategy::Unsupported => Err(CurtailError::unsupported_brand(self.as_str())),
        }
    }
}

impl fmt::Display for InverterBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InverterBrand {
    type Err = CurtailError;

    fn from_str(s: &str) -> Result<Self> {
        InverterBrand::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CurtailError::validation("inverter.brand", "unknown inverter brand"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_writes_percent_unchanged() {
        assert_eq!(
            InverterBrand::Sma.write_strategy(),
            WriteStrategy::LimitPercent
        );
        assert!((InverterBrand::Sma.control_value(42.5).unwrap() - 42.5).abs() < f64::EPSILON);
    }

    #[test]
    fn solaredge_has_no_write_path() {
        let err = InverterBrand::SolarEdge.control_value(50.0).unwrap_err();
        assert!(matches!(err, CurtailError::UnsupportedBrand { ref brand } if brand == "solaredge"));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("SMA".parse::<InverterBrand>().unwrap(), InverterBrand::Sma);
        assert_eq!(
            " SolarEdge ".parse::<InverterBrand>().unwrap(),
            InverterBrand::SolarEdge
        );
        assert!("fronius".parse::<InverterBrand>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let b: InverterBrand = serde_yaml::from_str("solaredge").unwrap();
        assert_eq!(b, InverterBrand::SolarEdge);
        assert!(serde_yaml::from_str::<InverterBrand>("huawei").is_err());
    }
}
