//! Capability resolution: which block serves which role

use super::{
    DER_AC_CONTROLS, DER_AC_MEASUREMENT, DER_CAPACITY, IMMEDIATE_CONTROLS, INVERTER_SINGLE_PHASE,
    INVERTER_SPLIT_PHASE, INVERTER_THREE_PHASE, ModelId, NAMEPLATE,
};
use crate::error::{CurtailError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// What the controller needs a device to provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Current AC output power
    Measurement,
    /// Active power limit in percent
    Control,
    /// Rated (maximum) output power
    Rating,
}

/// Location of a point inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PointRef {
    pub block: ModelId,
    pub offset: u16,
}

impl PointRef {
    pub const fn new(block: ModelId, offset: u16) -> Self {
        Self { block, offset }
    }
}

impl fmt::Display for PointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.block, self.offset)
    }
}

const MEASUREMENT_PREFERENCE: [PointRef; 4] = [
    PointRef::new(DER_AC_MEASUREMENT, 10),
    PointRef::new(INVERTER_SINGLE_PHASE, 14),
    PointRef::new(INVERTER_SPLIT_PHASE, 14),
    PointRef::new(INVERTER_THREE_PHASE, 14),
];

const CONTROL_PREFERENCE: [PointRef; 2] = [
    PointRef::new(DER_AC_CONTROLS, 15),
    PointRef::new(IMMEDIATE_CONTROLS, 5),
];

const RATING_PREFERENCE: [PointRef; 2] = [
    PointRef::new(DER_CAPACITY, 2),
    PointRef::new(NAMEPLATE, 3),
];

impl Role {
    pub const ALL: [Role; 3] = [Role::Measurement, Role::Control, Role::Rating];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Measurement => "measurement",
            Role::Control => "control",
            Role::Rating => "rating",
        }
    }

    /// Candidate points for this role, most preferred first
    pub fn preference(self) -> &'static [PointRef] {
        match self {
            Role::Measurement => &MEASUREMENT_PREFERENCE,
            Role::Control => &CONTROL_PREFERENCE,
            Role::Rating => &RATING_PREFERENCE,
        }
    }

    /// First candidate whose block the device exposes
    pub fn resolve(self, available: &BTreeSet<ModelId>) -> Option<PointRef> {
        self.preference()
            .iter()
            .copied()
            .find(|p| available.contains(&p.block))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved point for each role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityProfile {
    pub measurement: PointRef,
    pub control: PointRef,
    pub rating: PointRef,
}

impl CapabilityProfile {
    pub fn point(&self, role: Role) -> PointRef {
        match role {
            Role::Measurement => self.measurement,
            Role::Control => self.control,
            Role::Rating => self.rating,
        }
    }
}

/// Choose a block for every role from the device's block set
///
/// Fails with [`CurtailError::UnsupportedDevice`] naming the first role no
/// exposed block can serve.
pub fn resolve(available: &BTreeSet<ModelId>) -> Result<CapabilityProfile> {
    let pick = |role: Role| {
        role.resolve(available)
            .ok_or_else(|| CurtailError::unsupported_device(role.as_str()))
    };
    Ok(CapabilityProfile {
        measurement: pick(Role::Measurement)?,
        control: pick(Role::Control)?,
        rating: pick(Role::Rating)?,
    })
}
