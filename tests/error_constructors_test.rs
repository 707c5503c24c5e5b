use sunspec_curtail::error::CurtailError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        CurtailError::config("x"),
        CurtailError::Config { .. }
    ));
    assert!(matches!(
        CurtailError::modbus("x"),
        CurtailError::Modbus { .. }
    ));
    assert!(matches!(CurtailError::web("x"), CurtailError::Web { .. }));
    assert!(matches!(
        CurtailError::telemetry("x"),
        CurtailError::Telemetry { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(
        CurtailError::validation("f", "m"),
        CurtailError::Validation { .. }
    ));
    assert!(matches!(
        CurtailError::point_not_found(101, 14),
        CurtailError::PointNotFound {
            block: 101,
            offset: 14
        }
    ));
    assert!(matches!(
        CurtailError::unsupported_device("rating"),
        CurtailError::UnsupportedDevice { .. }
    ));
    assert!(matches!(
        CurtailError::unsupported_brand("solaredge"),
        CurtailError::UnsupportedBrand { .. }
    ));
}

#[test]
fn transport_classification() {
    assert!(CurtailError::modbus("x").is_transport());
    assert!(CurtailError::timeout("x").is_transport());
    assert!(CurtailError::io("x").is_transport());
    assert!(!CurtailError::exception("IllegalDataAddress").is_transport());
    assert!(!CurtailError::point_unavailable(123, 5).is_transport());
    assert!(!CurtailError::telemetry("x").is_transport());
}

#[test]
fn configuration_classification() {
    assert!(CurtailError::unsupported_device("control").is_configuration());
    assert!(CurtailError::config("x").is_configuration());
    assert!(!CurtailError::modbus("x").is_configuration());
}

#[test]
fn display_messages() {
    assert_eq!(
        CurtailError::unsupported_device("control").to_string(),
        "Unsupported device: no control block available"
    );
    assert_eq!(
        CurtailError::parse("abc").to_string(),
        "Parse error: 'abc' is not a number"
    );
}
