use serde::{Deserialize, Serialize};

use crate::geodesy::wrap_centered;

/// Estimate and error variance of one filtered axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisState {
    pub estimate: f64,
    pub variance: f64,
}

/// One-dimensional recursive estimator with a random-walk state model.
///
/// Predict adds the process noise to the error variance; update blends the
/// measurement in with gain `K = P / (P + R)`. A circular axis (such as
/// longitude) blends along the shorter way round and keeps its estimate in
/// `[-period/2, period/2)`.
#[derive(Clone, Debug)]
pub struct ScalarKalman {
    process_noise: f64,
    period: Option<f64>,
    state: Option<AxisState>,
}

impl ScalarKalman {
    pub fn new(process_noise: f64) -> Self {
        Self {
            process_noise,
            period: None,
            state: None,
        }
    }

    pub fn circular(process_noise: f64, period: f64) -> Self {
        Self {
            process_noise,
            period: Some(period),
            state: None,
        }
    }

    /// Seed the axis directly from a measurement.
    pub fn initialize(&mut self, value: f64, variance: f64) {
        self.state = Some(AxisState {
            estimate: value,
            variance,
        });
    }

    /// Run one predict-update cycle and return the new estimate.
    ///
    /// `measurement_noise` must be non-negative. An uninitialized axis is
    /// seeded from the measurement with variance `measurement_noise`.
    pub fn update(&mut self, measurement: f64, measurement_noise: f64) -> f64 {
        let Some(prev) = self.state else {
            self.initialize(measurement, measurement_noise);
            return measurement;
        };

        let predicted_variance = prev.variance + self.process_noise;
        let denom = predicted_variance + measurement_noise;
        // Both terms zero: no uncertainty anywhere, keep the prior
        let gain = if denom > 0.0 {
            predicted_variance / denom
        } else {
            0.0
        };

        let estimate = match self.period {
            Some(period) => {
                let innovation = wrap_centered(measurement - prev.estimate, period);
                wrap_centered(prev.estimate + gain * innovation, period)
            }
            None => prev.estimate + gain * (measurement - prev.estimate),
        };
        let variance = (1.0 - gain) * predicted_variance;
        self.state = Some(AxisState { estimate, variance });
        estimate
    }

    pub fn state(&self) -> Option<AxisState> {
        self.state
    }

    pub fn estimate(&self) -> Option<f64> {
        self.state.map(|s| s.estimate)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}
