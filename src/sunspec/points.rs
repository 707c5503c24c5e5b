//! Register encoding of the SunSpec points used for curtailment
//!
//! Offsets count from the block's ID register, so the two header
//! registers (`ID`, `L`) are offsets 0 and 1.

use super::{
    DER_AC_CONTROLS, DER_AC_MEASUREMENT, DER_CAPACITY, IMMEDIATE_CONTROLS, INVERTER_SINGLE_PHASE,
    INVERTER_SPLIT_PHASE, INVERTER_THREE_PHASE, ModelId, NAMEPLATE,
};
use crate::error::{CurtailError, Result};

/// "Not implemented" marker for int16 and sunssf registers
pub const INT16_NOT_IMPLEMENTED: u16 = 0x8000;
/// "Not implemented" marker for uint16 registers
pub const UINT16_NOT_IMPLEMENTED: u16 = 0xFFFF;

/// Scale factors outside this range are treated as invalid
const SCALE_FACTOR_RANGE: std::ops::RangeInclusive<i32> = -10..=10;

/// Register type of a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Int16,
    Uint16,
}

/// Encoding of one point: its type and where its scale factor lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointSpec {
    pub kind: PointKind,
    pub sf_offset: u16,
}

/// Encoding of a known point, `None` for points the controller never touches
pub fn point_spec(block: ModelId, offset: u16) -> Option<PointSpec> {
    let (kind, sf_offset) = match (block, offset) {
        // W
        (INVERTER_SINGLE_PHASE | INVERTER_SPLIT_PHASE | INVERTER_THREE_PHASE, 14) => {
            (PointKind::Int16, 15)
        }
        (DER_AC_MEASUREMENT, 10) => (PointKind::Int16, 116),
        // WRtg / WMaxRtg
        (NAMEPLATE, 3) => (PointKind::Uint16, 4),
        (DER_CAPACITY, 2) => (PointKind::Uint16, 45),
        // WMaxLimPct
        (IMMEDIATE_CONTROLS, 5) => (PointKind::Uint16, 23),
        (DER_AC_CONTROLS, 15) => (PointKind::Uint16, 50),
        _ => return None,
    };
    Some(PointSpec { kind, sf_offset })
}

/// Raw register as a number, `None` for the "not implemented" marker
pub fn decode_value(kind: PointKind, raw: u16) -> Option<f64> {
    match kind {
        PointKind::Int16 if raw == INT16_NOT_IMPLEMENTED => None,
        PointKind::Int16 => Some(f64::from(raw as i16)),
        PointKind::Uint16 if raw == UINT16_NOT_IMPLEMENTED => None,
        PointKind::Uint16 => Some(f64::from(raw)),
    }
}

/// Scale factor exponent, `None` when not implemented or out of range
pub fn decode_scale_factor(raw: u16) -> Option<i32> {
    if raw == INT16_NOT_IMPLEMENTED {
        return None;
    }
    let sf = i32::from(raw as i16);
    SCALE_FACTOR_RANGE.contains(&sf).then_some(sf)
}

pub fn apply_scale(value: f64, sf: i32) -> f64 {
    value * 10f64.powi(sf)
}

/// Engineering value to raw register, rounding to the register resolution
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_value(kind: PointKind, value: f64, sf: i32) -> Result<u16> {
    let raw = (value / 10f64.powi(sf)).round();
    if !raw.is_finite() {
        return Err(CurtailError::validation(
            "value".to_string(),
            format!("{} cannot be encoded", value),
        ));
    }
    match kind {
        PointKind::Int16 if raw >= -32767.0 && raw <= 32767.0 => Ok((raw as i16) as u16),
        PointKind::Uint16 if raw >= 0.0 && raw <= 65534.0 => Ok(raw as u16),
        _ => Err(CurtailError::validation(
            "value".to_string(),
            format!("{} out of register range at scale factor {}", value, sf),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_points_have_specs() {
        for block in [101, 102, 103] {
            assert_eq!(
                point_spec(block, 14),
                Some(PointSpec {
                    kind: PointKind::Int16,
                    sf_offset: 15
                })
            );
        }
        assert_eq!(point_spec(123, 5).map(|s| s.sf_offset), Some(23));
        assert_eq!(point_spec(704, 15).map(|s| s.sf_offset), Some(50));
        assert!(point_spec(123, 6).is_none());
        assert!(point_spec(1, 2).is_none());
    }

    #[test]
    fn sentinels_decode_to_none() {
        assert_eq!(decode_value(PointKind::Int16, 0x8000), None);
        assert_eq!(decode_value(PointKind::Uint16, 0xFFFF), None);
        assert_eq!(decode_value(PointKind::Int16, 0xFFFF), Some(-1.0));
        assert_eq!(decode_value(PointKind::Uint16, 0x8000), Some(32768.0));
        assert_eq!(decode_scale_factor(0x8000), None);
    }

    #[test]
    fn scale_factors() {
        assert_eq!(decode_scale_factor(0xFFFE), Some(-2));
        assert_eq!(decode_scale_factor(1), Some(1));
        assert_eq!(decode_scale_factor(40), None);
        assert!((apply_scale(4250.0, -2) - 42.5).abs() < 1e-9);
        assert!((apply_scale(512.0, 1) - 5120.0).abs() < 1e-9);
    }

    #[test]
    fn encode_rounds_to_register_resolution() {
        assert_eq!(encode_value(PointKind::Uint16, 42.5, -2).unwrap(), 4250);
        assert_eq!(encode_value(PointKind::Uint16, 100.0, 0).unwrap(), 100);
        assert_eq!(encode_value(PointKind::Int16, -1.0, 0).unwrap(), 0xFFFF);
        assert!(encode_value(PointKind::Uint16, -5.0, 0).is_err());
        assert!(encode_value(PointKind::Uint16, 100.0, -3).is_err());
    }
}
