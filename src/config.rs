use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

// ─── Position filter ─────────────────────────────────────────────────────────

/// Tuning for the per-axis position filter.
///
/// The defaults were tuned by hand for handheld phone GPS. They trade
/// responsiveness for on-screen stability and are not physical constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Variance added to each axis per update (Q)
    pub process_noise: f64,
    /// Reported accuracies below this (meters) are raised to it
    pub accuracy_floor_m: f64,
    /// Accuracy (meters) that maps to a measurement variance of 1.0
    pub reference_accuracy_m: f64,
    /// Error variance assigned to each axis on cold start
    pub initial_variance: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 1e-3,
            accuracy_floor_m: 50.0,
            reference_accuracy_m: 50.0,
            initial_variance: 25.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        require_non_negative("process_noise", self.process_noise)?;
        require_positive("accuracy_floor_m", self.accuracy_floor_m)?;
        require_positive("reference_accuracy_m", self.reference_accuracy_m)?;
        require_positive("initial_variance", self.initial_variance)?;
        Ok(())
    }
}

// ─── Update gate ─────────────────────────────────────────────────────────────

/// Thresholds for the update gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Movement (meters) from the last accepted estimate that forces an update
    pub min_distance_m: f64,
    /// Seconds after the last accepted estimate after which any estimate is accepted
    pub max_interval_secs: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 0.5,
            max_interval_secs: 2.0,
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        require_non_negative("min_distance_m", self.min_distance_m)?;
        require_positive("max_interval_secs", self.max_interval_secs)?;
        Ok(())
    }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub filter: FilterConfig,
    pub gate: GateConfig,
    /// A raw fix at least this far (meters) from the current estimate resets
    /// the filter and gate before it is processed. `None` disables it.
    pub recalibrate_jump_m: Option<f64>,
}

impl TrackerConfig {
    pub fn validate(&self) -> TrackerResult<()> {
        self.filter.validate()?;
        self.gate.validate()?;
        if let Some(jump) = self.recalibrate_jump_m {
            require_positive("recalibrate_jump_m", jump)?;
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> TrackerResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidConfig(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

fn require_non_negative(name: &str, value: f64) -> TrackerResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TrackerError::InvalidConfig(format!(
            "{name} must be a non-negative finite number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_filter_values() {
        let mut config = TrackerConfig::default();
        config.filter.reference_accuracy_m = 0.0;
        assert!(matches!(
            config.validate(),
            Err(TrackerError::InvalidConfig(msg)) if msg.contains("reference_accuracy_m")
        ));

        let mut config = TrackerConfig::default();
        config.filter.process_noise = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_gate_values() {
        let mut config = TrackerConfig::default();
        config.gate.min_distance_m = -1.0;
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.gate.max_interval_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_process_noise_allowed() {
        let mut config = TrackerConfig::default();
        config.filter.process_noise = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_jump() {
        let config = TrackerConfig {
            recalibrate_jump_m: Some(0.0),
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "gate": { "min_distance_m": 1.5 }, "recalibrate_jump_m": 200.0 }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.gate.min_distance_m, 1.5);
        assert_eq!(config.gate.max_interval_secs, 2.0);
        assert_eq!(config.filter, FilterConfig::default());
        assert_eq!(config.recalibrate_jump_m, Some(200.0));
    }
}
