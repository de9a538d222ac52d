//! Earth constants and lon/lat geometry.
//!
//! Longitudes and latitudes are in degrees unless a name says otherwise.

use std::f64::consts::PI;

/// Conversion factor from degrees to radians.
pub const DEG2RAD: f64 = PI / 180.0;

/// Spherical Earth model.
#[derive(Copy, Clone, Debug)]
pub struct Earth;

impl Earth {
    pub const RADIUS_IN_METERS: f64 = 6_371_229.0;
    pub const RADIUS_IN_KM: f64 = Self::RADIUS_IN_METERS / 1.0e3;

    pub fn area_in_sq_meters() -> f64 {
        4.0 * PI * Self::RADIUS_IN_METERS * Self::RADIUS_IN_METERS
    }

    pub fn area_in_sq_km() -> f64 {
        4.0 * PI * Self::RADIUS_IN_KM * Self::RADIUS_IN_KM
    }

    /// Great-circle central angle between two lon/lat points, in radians.
    pub fn central_angle(a: [f64; 2], b: [f64; 2]) -> f64 {
        // Vincenty form; stable for both tiny and antipodal separations.
        let (lon1, lat1) = (a[0] * DEG2RAD, a[1] * DEG2RAD);
        let (lon2, lat2) = (b[0] * DEG2RAD, b[1] * DEG2RAD);
        let dlon = lon2 - lon1;
        let (s1, c1) = lat1.sin_cos();
        let (s2, c2) = lat2.sin_cos();
        let (sd, cd) = dlon.sin_cos();
        let num = ((c2 * sd).powi(2) + (c1 * s2 - s1 * c2 * cd).powi(2)).sqrt();
        let den = s1 * s2 + c1 * c2 * cd;
        num.atan2(den)
    }

    /// Great-circle distance in meters.
    pub fn distance_in_meters(a: [f64; 2], b: [f64; 2]) -> f64 {
        Self::RADIUS_IN_METERS * Self::central_angle(a, b)
    }
}

/// Unit-sphere Cartesian coordinates of a lon/lat point.
pub fn lonlat_to_xyz(lonlat: [f64; 2]) -> [f64; 3] {
    let (sl, cl) = (lonlat[0] * DEG2RAD).sin_cos();
    let (sp, cp) = (lonlat[1] * DEG2RAD).sin_cos();
    [cp * cl, cp * sl, sp]
}

/// Wrap a longitude difference into `[-180, 180)`.
#[inline]
pub fn wrap_delta(dlon: f64) -> f64 {
    (dlon + 180.0).rem_euclid(360.0) - 180.0
}

/// Normalise a longitude into `[west, west + 360)`.
#[inline]
pub fn normalise_longitude(lon: f64, west: f64) -> f64 {
    west + (lon - west).rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_delta_crosses_dateline() {
        assert!((wrap_delta(350.0) - (-10.0)).abs() < 1e-12);
        assert!((wrap_delta(-350.0) - 10.0).abs() < 1e-12);
        assert!((wrap_delta(45.0) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn normalise_into_window() {
        assert!((normalise_longitude(-10.0, 0.0) - 350.0).abs() < 1e-12);
        assert!((normalise_longitude(370.0, 0.0) - 10.0).abs() < 1e-12);
        assert!((normalise_longitude(190.0, -180.0) - (-170.0)).abs() < 1e-12);
    }

    #[test]
    fn quarter_circle_distance() {
        let d = Earth::distance_in_meters([0.0, 0.0], [90.0, 0.0]);
        assert!((d - Earth::RADIUS_IN_METERS * PI / 2.0).abs() < 1e-6);
        let pole = Earth::central_angle([0.0, 0.0], [123.0, 90.0]);
        assert!((pole - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn xyz_is_unit_length() {
        let p = lonlat_to_xyz([37.0, -61.0]);
        let n = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!((n - 1.0).abs() < 1e-14);
    }
}
