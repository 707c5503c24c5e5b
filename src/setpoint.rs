//! Power setpoint computation for price-aware curtailment
//!
//! Pure functions deciding how much AC power the inverter may produce given
//! the injection tariff, the grid meter and the inverter's own output.

use serde::Serialize;

/// One set of inputs for [`SetpointEngine::compute_watts`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointInputs {
    /// Current injection tariff
    pub tariff: f64,
    /// Grid import in watts
    pub import_w: f64,
    /// Grid export in watts
    pub export_w: f64,
    /// Inverter AC output in watts
    pub pv_w: f64,
    /// Inverter rated power in watts
    pub rated_w: f64,
    /// Grid import seen on the previous tick
    pub prev_import_w: Option<f64>,
    /// Grid export seen on the previous tick
    pub prev_export_w: Option<f64>,
    /// Setpoint computed on the previous tick
    pub prev_setpoint_w: Option<f64>,
}

/// Which rule produced a setpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetpointReason {
    /// Meter sample unchanged, previous setpoint kept
    Unchanged,
    /// Tariff at or above cutoff, full output allowed
    AboveCutoff,
    /// Importing while curtailed, limit raised
    Importing,
    /// Exporting while curtailed, limit lowered
    Exporting,
    /// Curtailment switched off, full output forced
    Disabled,
}

/// Setpoint rules parameterised by the configured thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointEngine {
    cutoff_tariff: f64,
    import_threshold_w: f64,
}

impl SetpointEngine {
    pub fn new(cutoff_tariff: f64, import_threshold_w: f64) -> Self {
        Self {
            cutoff_tariff,
            import_threshold_w,
        }
    }

    pub fn cutoff_tariff(&self) -> f64 {
        self.cutoff_tariff
    }

    /// New power limit in whole watts
    pub fn compute_watts(&self, inputs: &SetpointInputs) -> f64 {
        self.compute(inputs).0
    }

    /// New power limit in whole watts together with the rule that produced it
    ///
    /// The result always lies within `[0, rated_w]`, also for slightly
    /// negative output readings or output above the rating.
    pub fn compute(&self, inputs: &SetpointInputs) -> (f64, SetpointReason) {
        let (sp, reason) = self.apply_rules(inputs);
        (clamp_to_rating(sp, inputs.rated_w).round(), reason)
    }

    #[allow(clippy::float_cmp)]
    fn apply_rules(&self, inputs: &SetpointInputs) -> (f64, SetpointReason) {
        // A repeated meter sample means nothing new is known
        if Some(inputs.import_w) == inputs.prev_import_w
            && Some(inputs.export_w) == inputs.prev_export_w
            && let Some(prev) = inputs.prev_setpoint_w
        {
            return (prev, SetpointReason::Unchanged);
        }

        if inputs.tariff >= self.cutoff_tariff {
            return (inputs.rated_w, SetpointReason::AboveCutoff);
        }

        if inputs.import_w > self.import_threshold_w {
            return (inputs.pv_w + inputs.import_w, SetpointReason::Importing);
        }

        (inputs.pv_w - inputs.export_w, SetpointReason::Exporting)
    }
}

fn clamp_to_rating(setpoint_w: f64, rated_w: f64) -> f64 {
    setpoint_w.max(0.0).min(rated_w.max(0.0))
}

/// Full rated output, used while curtailment is switched off
pub fn disabled_setpoint(rated_w: f64) -> (f64, f64, SetpointReason) {
    (rated_w.round(), 100.0, SetpointReason::Disabled)
}

/// Setpoint as percent of rated power, rounded to two decimals
pub fn compute_percent(setpoint_w: f64, rated_w: f64) -> f64 {
    if rated_w <= 0.0 {
        return 0.0;
    }
    (setpoint_w / rated_w * 100.0 * 100.0).round() / 100.0
}

/// Whether a freshly computed setpoint has to be sent to the device
#[allow(clippy::float_cmp)]
pub fn should_write(new_setpoint_w: f64, last_sent_w: Option<f64>) -> bool {
    match last_sent_w {
        None => true,
        Some(last) => last != new_setpoint_w,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> SetpointInputs {
        SetpointInputs {
            tariff: 10.0,
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
    fn import_threshold_is_exclusive() {
        let engine = SetpointEngine::new(50.0, 5.0);
        let at = SetpointInputs {
            import_w: 5.0,
            export_w: 0.0,
            ..inputs()
        };
        assert_eq!(engine.compute(&at).1, SetpointReason::Exporting);
        let above = SetpointInputs {
            import_w: 5.5,
            ..inputs()
        };
        assert_eq!(engine.compute(&above).1, SetpointReason::Importing);
    }

    #[test]
    fn unchanged_needs_previous_setpoint() {
        let engine = SetpointEngine::new(50.0, 5.0);
        let i = SetpointInputs {
            export_w: 500.0,
            prev_import_w: Some(0.0),
            prev_export_w: Some(500.0),
            ..inputs()
        };
        assert_eq!(engine.compute(&i), (2500.0, SetpointReason::Exporting));
    }

    #[test]
    fn percent_of_zero_rating_is_zero() {
        assert_eq!(compute_percent(100.0, 0.0), 0.0);
    }

    #[test]
    fn write_gate() {
        assert!(should_write(5000.0, None));
        assert!(!should_write(5000.0, Some(5000.0)));
        assert!(should_write(4000.0, Some(5000.0)));
    }
}
