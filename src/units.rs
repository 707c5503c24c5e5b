//! Conversion of tagged power readings to watts

use crate::error::{CurtailError, Result};
use std::str::FromStr;

/// Power units a telemetry reading may be tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUnit {
    Kilowatt,
    Watt,
    /// `mW`, and `MW` which meters in the field use for the same scale
    Milliwatt,
}

impl PowerUnit {
    /// Multiplier taking a value in this unit to watts
    pub fn to_watts_factor(self) -> f64 {
        match self {
            PowerUnit::Kilowatt => 1e3,
            PowerUnit::Watt => 1.0,
            PowerUnit::Milliwatt => 1e-3,
        }
    }
}

impl FromStr for PowerUnit {
    type Err = CurtailError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kW" => Ok(PowerUnit::Kilowatt),
            "W" => Ok(PowerUnit::Watt),
            "mW" | "MW" => Ok(PowerUnit::Milliwatt),
            other => Err(CurtailError::unknown_unit(other)),
        }
    }
}

/// Parse a raw state string as a finite real number
pub fn parse_number(raw: &str) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CurtailError::parse(raw)),
    }
}

/// Convert a raw reading and its unit symbol to watts
pub fn normalize(raw: &str, unit: Option<&str>) -> Result<f64> {
    let value = parse_number(raw)?;
    let unit: PowerUnit = unit
        .ok_or_else(|| CurtailError::unknown_unit("<none>"))?
        .parse()?;
    Ok(value * unit.to_watts_factor())
}
