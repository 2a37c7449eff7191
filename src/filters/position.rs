use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::filters::scalar::{AxisState, ScalarKalman};
use crate::geodesy::wrap_longitude;
use crate::types::{FilteredEstimate, RawFix};

/// Snapshot of every axis of the position filter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub latitude: AxisState,
    pub longitude: AxisState,
    pub altitude: Option<AxisState>,
}

/// Smooths a stream of position fixes with one scalar estimator per axis.
///
/// The first fix after construction or `reset` is returned unchanged. Later
/// fixes are weighted by their reported accuracy: a fix claiming a large
/// accuracy radius moves the estimate less than a precise one.
///
/// Longitude is filtered on a circle, so a stream straddling the
/// antimeridian stays there. Non-finite coordinates are skipped per axis the
/// same way a missing altitude is.
pub struct PositionFilter {
    config: FilterConfig,
    latitude: ScalarKalman,
    longitude: ScalarKalman,
    altitude: ScalarKalman,
    current: Option<FilteredEstimate>,
    update_count: u64,
}

impl PositionFilter {
    pub fn new(config: FilterConfig) -> Self {
        let q = config.process_noise;
        Self {
            config,
            latitude: ScalarKalman::new(q),
            longitude: ScalarKalman::circular(q, 360.0),
            altitude: ScalarKalman::new(q),
            current: None,
            update_count: 0,
        }
    }

    /// Measurement variance for a fix with the given accuracy radius.
    ///
    /// `f64::max` drops NaN, so missing, negative and zero accuracies all land on the floor.
    pub fn measurement_noise(&self, accuracy: f64) -> f64 {
        let clamped = accuracy.max(self.config.accuracy_floor_m);
        (clamped / self.config.reference_accuracy_m).powi(2)
    }

    /// Consume one fix and return the updated estimate.
    pub fn filter(&mut self, fix: &RawFix) -> FilteredEstimate {
        self.update_count += 1;

        let altitude = fix.altitude.filter(|a| a.is_finite());

        if !self.is_initialized() {
            if !fix.has_finite_position() {
                log::warn!(
                    "Position filter skipping non-finite fix ({}, {}) before cold start",
                    fix.latitude,
                    fix.longitude
                );
                return FilteredEstimate::from(*fix).with_altitude(altitude);
            }
            let p0 = self.config.initial_variance;
            self.latitude.initialize(fix.latitude, p0);
            self.longitude.initialize(wrap_longitude(fix.longitude), p0);
            if let Some(alt) = altitude {
                self.altitude.initialize(alt, p0);
            }
            log::debug!(
                "Position filter cold start at ({:.7}, {:.7}) acc={:.1}m",
                fix.latitude,
                fix.longitude,
                fix.accuracy
            );
            let estimate = FilteredEstimate::from(*fix).with_altitude(altitude);
            self.current = Some(estimate);
            return estimate;
        }

        let r = self.measurement_noise(fix.accuracy);
        let latitude = update_finite(&mut self.latitude, fix.latitude, r);
        let longitude = update_finite(&mut self.longitude, fix.longitude, r);
        if !fix.has_finite_position() {
            log::warn!(
                "Position filter kept prior for non-finite coordinate ({}, {})",
                fix.latitude,
                fix.longitude
            );
        }

        match altitude {
            Some(alt) if self.altitude.is_initialized() => {
                self.altitude.update(alt, r);
            }
            Some(alt) => self.altitude.initialize(alt, self.config.initial_variance),
            None => {}
        }

        log::trace!(
            "Position filter update #{}: raw=({:.7}, {:.7}) est=({:.7}, {:.7}) R={:.4}",
            self.update_count,
            fix.latitude,
            fix.longitude,
            latitude,
            longitude,
            r
        );

        let estimate = FilteredEstimate {
            latitude,
            longitude,
            altitude: self.altitude.estimate(),
            accuracy: fix.accuracy,
            timestamp: fix.timestamp,
        };
        self.current = Some(estimate);
        estimate
    }

    /// Last value returned by `filter`, or `None` before the first fix.
    pub fn current_estimate(&self) -> Option<FilteredEstimate> {
        self.current
    }

    pub fn state(&self) -> Option<FilterState> {
        Some(FilterState {
            latitude: self.latitude.state()?,
            longitude: self.longitude.state()?,
            altitude: self.altitude.state(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.latitude.is_initialized() && self.longitude.is_initialized()
    }

    /// Number of fixes consumed since construction or the last reset
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Forget all axis state; the next fix is treated as a cold start.
    pub fn reset(&mut self) {
        self.latitude.reset();
        self.longitude.reset();
        self.altitude.reset();
        self.current = None;
        self.update_count = 0;
        log::debug!("Position filter reset");
    }
}

/// Update the axis with a finite measurement, otherwise keep its estimate.
fn update_finite(axis: &mut ScalarKalman, measurement: f64, r: f64) -> f64 {
    match axis.estimate() {
        Some(prior) if !measurement.is_finite() => prior,
        _ => axis.update(measurement, r),
    }
}

impl Default for PositionFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::{haversine_distance, offset_meters};
    use approx::assert_abs_diff_eq;

    /// Deterministic zero-mean noise in [-1, 1]
    fn noise(i: u64) -> f64 {
        let x = i.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((x >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }

    fn fix(lat: f64, lon: f64, acc: f64, ts: f64) -> RawFix {
        RawFix::new(lat, lon, 0.0, acc, ts)
    }

    #[test]
    fn test_cold_start_returns_input() {
        let mut filter = PositionFilter::default();
        let raw = RawFix::new(30.0, 31.0, 120.0, 5.0, 1.0);
        let est = filter.filter(&raw);
        assert_eq!(est, FilteredEstimate::from(raw));
        assert_eq!(filter.current_estimate(), Some(est));
    }

    #[test]
    fn test_measurement_noise_floor() {
        let filter = PositionFilter::default();
        for &acc in &[0.0, -3.0, 1e-12, 5.0, 50.0, f64::NAN] {
            assert_eq!(filter.measurement_noise(acc), 1.0, "accuracy {acc}");
        }
        assert_abs_diff_eq!(filter.measurement_noise(100.0), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(filter.measurement_noise(500.0), 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_accuracy_does_not_blow_up() {
        let mut filter = PositionFilter::default();
        filter.filter(&fix(30.0, 31.0, 0.0, 0.0));
        let est = filter.filter(&fix(30.0001, 31.0001, 0.0, 1.0));
        assert!(est.latitude.is_finite() && est.longitude.is_finite());
        assert!(est.latitude > 30.0 && est.latitude < 30.0001);
    }

    #[test]
    fn test_metadata_passes_through() {
        let mut filter = PositionFilter::default();
        filter.filter(&fix(30.0, 31.0, 5.0, 0.0));
        let est = filter.filter(&fix(30.001, 31.0, 17.5, 42.0));
        assert_eq!(est.accuracy, 17.5);
        assert_eq!(est.timestamp, 42.0);
    }

    #[test]
    fn test_convergence_on_stationary_point() {
        let (true_lat, true_lon) = (30.0, 31.0);
        let mut filter = PositionFilter::default();

        let mut raw_sq = 0.0;
        let mut est_sq = 0.0;
        let mut samples = 0.0;
        let mut last_var = f64::INFINITY;

        for i in 0..400u64 {
            let (lat, lon) = offset_meters(true_lat, true_lon, 3.0 * noise(2 * i), 3.0 * noise(2 * i + 1));
            let est = filter.filter(&fix(lat, lon, 5.0, i as f64));

            if i > 0 {
                let var = filter.state().unwrap().latitude.variance;
                assert!(var <= last_var, "variance grew at step {i}");
                assert!(var > 0.0);
                last_var = var;
            }

            if i >= 50 {
                raw_sq += haversine_distance(true_lat, true_lon, lat, lon).powi(2);
                est_sq += haversine_distance(true_lat, true_lon, est.latitude, est.longitude).powi(2);
                samples += 1.0;
            }
        }

        let raw_var = raw_sq / samples;
        let est_var = est_sq / samples;
        assert!(est_var < raw_var / 4.0, "filtered {est_var} vs raw {raw_var}");
    }

    #[test]
    fn test_convergence_across_antimeridian() {
        let mut filter = PositionFilter::default();

        for i in 0..200u64 {
            let lon = if i % 2 == 0 { 179.99999 } else { -179.99999 };
            let est = filter.filter(&fix(-16.5, lon, 5.0, i as f64));

            assert!((-180.0..180.0).contains(&est.longitude), "longitude {}", est.longitude);
            let off = haversine_distance(-16.5, 180.0, est.latitude, est.longitude);
            assert!(off < 3.0, "step {i}: {off} m from the antimeridian");
        }
    }

    #[test]
    fn test_non_finite_coordinates_keep_prior() {
        let mut filter = PositionFilter::default();
        let first = filter.filter(&fix(30.0, 31.0, 5.0, 0.0));

        let est = filter.filter(&fix(f64::NAN, 31.0, 7.0, 1.0));
        assert_eq!(est.latitude, first.latitude);
        assert!(est.longitude.is_finite());
        assert_eq!(est.accuracy, 7.0);
        assert_eq!(est.timestamp, 1.0);

        let est = filter.filter(&fix(30.0, f64::INFINITY, 5.0, 2.0));
        assert!(est.longitude.is_finite());
        assert!((est.longitude - 31.0).abs() < 1e-9);

        let (lat, _) = offset_meters(30.0, 31.0, 11.0, 0.0);
        let est = filter.filter(&fix(lat, 31.0, 5.0, 3.0));
        assert!(est.latitude.is_finite() && est.latitude > 30.0);
        let state = filter.state().unwrap();
        assert!(state.latitude.variance.is_finite() && state.longitude.variance.is_finite());
    }

    #[test]
    fn test_non_finite_fix_does_not_cold_start() {
        let mut filter = PositionFilter::default();
        filter.filter(&fix(f64::NAN, f64::NAN, 5.0, 0.0));
        assert!(!filter.is_initialized());
        assert_eq!(filter.current_estimate(), None);

        let raw = fix(30.0, 31.0, 5.0, 1.0);
        assert_eq!(filter.filter(&raw), FilteredEstimate::from(raw));
    }

    #[test]
    fn test_non_finite_altitude_is_unknown() {
        let mut filter = PositionFilter::default();
        filter.filter(&RawFix::new(30.0, 31.0, 100.0, 5.0, 0.0));
        let est = filter.filter(&RawFix::new(30.0, 31.0, f64::NAN, 5.0, 1.0));
        assert_eq!(est.altitude, Some(100.0));
    }

    #[test]
    fn test_worse_accuracy_moves_less() {
        let mut precise = PositionFilter::default();
        let mut sloppy = PositionFilter::default();

        let start = 30.0;
        let (target, _) = offset_meters(start, 31.0, 10.0, 0.0);

        precise.filter(&fix(start, 31.0, 5.0, 0.0));
        sloppy.filter(&fix(start, 31.0, 500.0, 0.0));

        for step in 1..=5 {
            let ts = step as f64;
            let a = precise.filter(&fix(target, 31.0, 5.0, ts));
            let b = sloppy.filter(&fix(target, 31.0, 500.0, ts));
            assert!(a.latitude - start > b.latitude - start, "step {step}");
            assert!(b.latitude > start);
        }
    }

    #[test]
    fn test_unknown_altitude_preserves_estimate() {
        let mut filter = PositionFilter::default();
        filter.filter(&RawFix::new(30.0, 31.0, 100.0, 5.0, 0.0));
        let est = filter.filter(&RawFix::new(30.0, 31.0, 0.0, 5.0, 1.0));
        assert_eq!(est.altitude, Some(100.0));

        let est = filter.filter(&RawFix::new(30.0, 31.0, 110.0, 5.0, 2.0));
        let alt = est.altitude.unwrap();
        assert!(alt > 100.0 && alt < 110.0);
    }

    #[test]
    fn test_altitude_axis_initializes_late() {
        let mut filter = PositionFilter::default();
        let est = filter.filter(&fix(30.0, 31.0, 5.0, 0.0));
        assert_eq!(est.altitude, None);
        assert!(filter.state().unwrap().altitude.is_none());

        let est = filter.filter(&RawFix::new(30.0, 31.0, 55.0, 5.0, 1.0));
        assert_eq!(est.altitude, Some(55.0));
    }

    #[test]
    fn test_reset_reproduces_cold_start() {
        let fixes = [
            fix(30.0, 31.0, 5.0, 0.0),
            fix(30.00002, 31.00001, 8.0, 1.0),
            fix(30.00004, 31.0, 3.0, 2.0),
        ];

        let mut filter = PositionFilter::default();
        let first: Vec<_> = fixes.iter().map(|f| filter.filter(f)).collect();

        filter.reset();
        assert!(!filter.is_initialized());
        assert_eq!(filter.current_estimate(), None);
        assert_eq!(filter.update_count(), 0);

        let second: Vec<_> = fixes.iter().map(|f| filter.filter(f)).collect();
        assert_eq!(first, second);
    }
}
