use serde::{Deserialize, Deserializer, Serialize};

/// Altitude value that location sources report when they have no altitude data.
pub const UNKNOWN_ALTITUDE: f64 = 0.0;

/// A single position reading from the location source.
///
/// `accuracy` is a radius in meters (larger = less trustworthy) and
/// `timestamp` is in seconds. Only timestamp differences are ever used, so
/// either a monotonic clock or epoch seconds work.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "altitude_or_unknown")]
    pub altitude: Option<f64>,
    pub accuracy: f64,
    pub timestamp: f64,
}

/// Logged fixes carry the source's raw altitude, so `0.0` means "no altitude"
/// on the wire just as it does in [`RawFix::new`].
fn altitude_or_unknown<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let altitude = Option::<f64>::deserialize(deserializer)?;
    Ok(altitude.filter(|&a| a != UNKNOWN_ALTITUDE))
}

impl RawFix {
    /// Build a fix from a source that encodes "no altitude" as `0.0`.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, accuracy: f64, timestamp: f64) -> Self {
        let altitude = if altitude == UNKNOWN_ALTITUDE {
            None
        } else {
            Some(altitude)
        };
        Self {
            latitude,
            longitude,
            altitude,
            accuracy,
            timestamp,
        }
    }

    /// Replace the altitude with an explicit present/absent value.
    ///
    /// Use this when the source has a real "has altitude" flag, so a genuine
    /// sea-level reading is not mistaken for missing data.
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }

    /// Latitude and longitude are both finite numbers.
    pub fn has_finite_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Position and timestamp are finite, so the fix can be filtered and gated.
    pub fn is_usable(&self) -> bool {
        self.has_finite_position() && self.timestamp.is_finite()
    }
}

/// The position filter's best estimate after consuming a fix.
///
/// `accuracy` and `timestamp` are copied from the fix that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilteredEstimate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: f64,
    pub timestamp: f64,
}

impl FilteredEstimate {
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }
}

impl From<RawFix> for FilteredEstimate {
    fn from(fix: RawFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: fix.altitude,
            accuracy: fix.accuracy,
            timestamp: fix.timestamp,
        }
    }
}
