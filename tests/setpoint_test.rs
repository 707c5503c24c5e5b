use sunspec_curtail::setpoint::{
    SetpointEngine, SetpointInputs, SetpointReason, compute_percent, disabled_setpoint,
    should_write,
};

fn base() -> SetpointInputs {
    SetpointInputs {
        tariff: 50.0,
        import_w: 0.0,
        export_w: 0.0,
        pv_w: 3000.0,
        rated_w: 5000.0,
        prev_import_w: None,
        prev_export_w: None,
        prev_setpoint_w: None,
    }
}

#[test]
fn above_cutoff_allows_rated_power() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        tariff: 250.0,
        import_w: 900.0,
        export_w: 1200.0,
        rated_w: 4999.6,
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (5000.0, SetpointReason::AboveCutoff));
}

#[test]
fn importing_raises_limit() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        import_w: 10.0,
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (3010.0, SetpointReason::Importing));
    assert!((compute_percent(3010.0, 5000.0) - 60.2).abs() < 1e-9);
}

#[test]
fn importing_is_capped_at_rated_power() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        import_w: 4000.0,
        ..base()
    };
    assert_eq!(engine.compute_watts(&inputs), 5000.0);
}

#[test]
fn exporting_lowers_limit() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        export_w: 800.0,
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (2200.0, SetpointReason::Exporting));
}

#[test]
fn exporting_never_goes_negative() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        export_w: 4500.0,
        ..base()
    };
    assert_eq!(engine.compute_watts(&inputs), 0.0);
}

#[test]
fn repeated_meter_sample_keeps_previous_setpoint() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        export_w: 800.0,
        pv_w: 2500.0,
        prev_import_w: Some(0.0),
        prev_export_w: Some(800.0),
        prev_setpoint_w: Some(2200.0),
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (2200.0, SetpointReason::Unchanged));
}

#[test]
fn setpoint_stays_within_bounds() {
    let engine = SetpointEngine::new(200.0, 5.0);
    for tariff in [-10.0, 0.0, 199.99, 200.0, 500.0] {
        for import_w in [0.0, 5.0, 5.1, 10.0, 2500.0, 10_000.0] {
            for export_w in [0.0, 50.0, 100.0, 3000.0, 9000.0] {
                for pv_w in [-20.0, 0.0, 3000.0, 5000.0, 5150.0] {
                    let inputs = SetpointInputs {
                        tariff,
                        import_w,
                        export_w,
                        pv_w,
                        ..base()
                    };
                    let sp = engine.compute_watts(&inputs);
                    assert!((0.0..=5000.0).contains(&sp), "{sp} out of range");
                    assert_eq!(sp, sp.round());
                }
            }
        }
    }
}

#[test]
fn negative_output_while_importing_floors_at_zero() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        tariff: 10.0,
        import_w: 10.0,
        pv_w: -20.0,
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (0.0, SetpointReason::Importing));
    assert_eq!(compute_percent(0.0, 5000.0), 0.0);
}

#[test]
fn output_above_rating_while_exporting_caps_at_rated() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        tariff: 10.0,
        export_w: 50.0,
        pv_w: 5150.0,
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (5000.0, SetpointReason::Exporting));
    assert_eq!(compute_percent(5000.0, 5000.0), 100.0);
}

#[test]
fn repeated_sample_is_bounded_by_current_rating() {
    let engine = SetpointEngine::new(200.0, 5.0);
    let inputs = SetpointInputs {
        rated_w: 4000.0,
        prev_import_w: Some(0.0),
        prev_export_w: Some(0.0),
        prev_setpoint_w: Some(4500.0),
        ..base()
    };
    assert_eq!(engine.compute(&inputs), (4000.0, SetpointReason::Unchanged));
}

#[test]
fn disabled_forces_full_output() {
    assert_eq!(
        disabled_setpoint(4200.4),
        (4200.0, 100.0, SetpointReason::Disabled)
    );
}

#[test]
fn write_gate() {
    assert!(should_write(3000.0, None));
    assert!(!should_write(3000.0, Some(3000.0)));
    assert!(should_write(3001.0, Some(3000.0)));
}
