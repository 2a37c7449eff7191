// Geodesy helpers - spherical Earth distance and small local offsets
//
// Everything here treats the Earth as a sphere of mean radius. That is good to
// well under a meter at the scales the update gate cares about.

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon points (degrees)
///
/// Haversine form. The intermediate term is clamped to [0, 1] so that
/// floating point overshoot for identical or antipodal points cannot produce NaN.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Wrap a value onto a circle of the given period, centred on zero
///
/// Result is in [-period/2, period/2). With period 360 this normalizes
/// longitudes and longitude differences across the antimeridian.
pub fn wrap_centered(value: f64, period: f64) -> f64 {
    let half = period / 2.0;
    (value + half).rem_euclid(period) - half
}

/// Normalize a longitude (degrees) into [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    wrap_centered(lon, 360.0)
}

/// Move a point by `north_m` / `east_m` meters on a local tangent plane
///
/// Returns (lat, lon) in degrees. Only meaningful for offsets that are small
/// compared to the Earth radius.
pub fn offset_meters(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let d_lat = north_m / EARTH_RADIUS_M;
    let d_lon = east_m / (EARTH_RADIUS_M * lat.to_radians().cos());
    (lat + d_lat.to_degrees(), wrap_longitude(lon + d_lon.to_degrees()))
}
