//! Error types and handling for sunspec-curtail
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for curtailment operations
pub type Result<T> = std::result::Result<T, CurtailError>;

/// Main error type for sunspec-curtail
#[derive(Debug, Error)]
pub enum CurtailError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// The device exposes no block usable for a capability role
    #[error("Unsupported device: no {role} block available")]
    UnsupportedDevice { role: String },

    /// The configured brand has no write strategy
    #[error("Writing setpoints is not implemented for brand '{brand}'")]
    UnsupportedBrand { brand: String },

    /// External telemetry value missing or unreadable
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    /// A reading could not be parsed as a number
    #[error("Parse error: '{value}' is not a number")]
    Parse { value: String },

    /// A reading carries a unit that cannot be converted to watts
    #[error("Unknown unit: {unit}")]
    UnknownUnit { unit: String },

    /// Modbus communication errors
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// A SunSpec point is not present in the discovered register map
    #[error("Point not found: block {block}, offset {offset}")]
    PointNotFound { block: u16, offset: u16 },

    /// A SunSpec point reports its "not implemented" value
    #[error("Point unavailable: block {block}, offset {offset}")]
    PointUnavailable { block: u16, offset: u16 },

    /// The device answered with a Modbus exception
    #[error("Device exception: {message}")]
    Exception { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl CurtailError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        CurtailError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        CurtailError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported device error for the given capability role
    pub fn unsupported_device<S: Into<String>>(role: S) -> Self {
        CurtailError::UnsupportedDevice { role: role.into() }
    }

    /// Create an unsupported brand error
    pub fn unsupported_brand<S: Into<String>>(brand: S) -> Self {
        CurtailError::UnsupportedBrand {
            brand: brand.into(),
        }
    }

    /// Create a new telemetry error
    pub fn telemetry<S: Into<String>>(message: S) -> Self {
        CurtailError::Telemetry {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(value: S) -> Self {
        CurtailError::Parse {
            value: value.into(),
        }
    }

    /// Create a new unknown unit error
    pub fn unknown_unit<S: Into<String>>(unit: S) -> Self {
        CurtailError::UnknownUnit { unit: unit.into() }
    }

    /// Create a new Modbus error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        CurtailError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        CurtailError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        CurtailError::Io {
            message: message.into(),
        }
    }

    /// Create a new point-not-found error
    pub fn point_not_found(block: u16, offset: u16) -> Self {
        CurtailError::PointNotFound { block, offset }
    }

    /// Create a new point-unavailable error
    pub fn point_unavailable(block: u16, offset: u16) -> Self {
        CurtailError::PointUnavailable { block, offset }
    }

    /// Create a new device exception error
    pub fn exception<S: Into<String>>(message: S) -> Self {
        CurtailError::Exception {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        CurtailError::Network {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        CurtailError::Web {
            message: message.into(),
        }
    }

    /// Whether the error means the device link is gone and must be rebuilt
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CurtailError::Modbus { .. } | CurtailError::Timeout { .. } | CurtailError::Io { .. }
        )
    }

    /// Whether the error is fatal at setup time and must not be retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CurtailError::Config { .. }
                | CurtailError::Validation { .. }
                | CurtailError::UnsupportedDevice { .. }
                | CurtailError::UnsupportedBrand { .. }
        )
    }
}

impl From<std::io::Error> for CurtailError {
    fn from(err: std::io::Error) -> Self {
        CurtailError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for CurtailError {
    fn from(err: serde_yaml::Error) -> Self {
        CurtailError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CurtailError {
    fn from(err: serde_json::Error) -> Self {
        CurtailError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CurtailError {
    fn from(err: reqwest::Error) -> Self {
        CurtailError::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CurtailError::config("test config error");
        assert!(matches!(err, CurtailError::Config { .. }));

        let err = CurtailError::modbus("test modbus error");
        assert!(matches!(err, CurtailError::Modbus { .. }));

        let err = CurtailError::validation("field", "test validation error");
        assert!(matches!(err, CurtailError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = CurtailError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = CurtailError::unsupported_device("measurement");
        assert_eq!(
            format!("{}", err),
            "Unsupported device: no measurement block available"
        );
    }

    #[test]
    fn test_transport_classification() {
        assert!(CurtailError::modbus("broken pipe").is_transport());
        assert!(CurtailError::timeout("read").is_transport());
        assert!(CurtailError::io("reset").is_transport());
        assert!(!CurtailError::point_not_found(123, 5).is_transport());
        assert!(!CurtailError::exception("IllegalDataAddress").is_transport());
        assert!(!CurtailError::unsupported_brand("solaredge").is_transport());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(CurtailError::unsupported_device("control").is_configuration());
        assert!(CurtailError::unsupported_brand("solaredge").is_configuration());
        assert!(!CurtailError::telemetry("missing").is_configuration());
        assert!(!CurtailError::modbus("x").is_configuration());
    }
}
