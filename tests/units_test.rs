use sunspec_curtail::error::CurtailError;
use sunspec_curtail::units::{PowerUnit, normalize, parse_number};

#[test]
fn converts_known_units() {
    assert_eq!(normalize("1.5", Some("kW")).unwrap(), 1500.0);
    assert_eq!(normalize("750", Some("W")).unwrap(), 750.0);
    assert!((normalize("2000", Some("mW")).unwrap() - 2.0).abs() < 1e-12);
    assert!((normalize("2000", Some("MW")).unwrap() - 2.0).abs() < 1e-12);
}

#[test]
fn unknown_or_missing_unit_is_rejected() {
    assert!(matches!(
        normalize("1", Some("kWh")),
        Err(CurtailError::UnknownUnit { .. })
    ));
    assert!(matches!(
        normalize("1", None),
        Err(CurtailError::UnknownUnit { .. })
    ));
}

#[test]
fn malformed_numbers_are_rejected() {
    for raw in ["", "unavailable", "unknown", "NaN", "inf", "1,5"] {
        assert!(
            matches!(parse_number(raw), Err(CurtailError::Parse { .. })),
            "{raw} parsed"
        );
    }
    assert_eq!(parse_number(" -3.25 ").unwrap(), -3.25);
}

#[test]
fn unit_symbols_are_case_sensitive() {
    assert!("kw".parse::<PowerUnit>().is_err());
    assert_eq!("kW".parse::<PowerUnit>().unwrap(), PowerUnit::Kilowatt);
}
