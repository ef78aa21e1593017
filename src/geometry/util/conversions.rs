//! Conversions between geographic coordinates, unit vectors and counts.

use num_traits::NumCast;

use super::norms::hypot;

/// Converts a latitude/longitude pair in degrees to a point on the unit sphere.
///
/// Uses the spherical (not ellipsoidal) model:
/// `x = cos φ cos λ`, `y = cos φ sin λ`, `z = sin φ`.
///
/// # Examples
///
/// ```
/// use approx::assert_relative_eq;
/// use orthtree_delaunay::geometry::util::lat_lon_to_unit_vector;
///
/// let north = lat_lon_to_unit_vector(90.0, 0.0);
/// assert_relative_eq!(north[2], 1.0, epsilon = 1e-12);
///
/// let east = lat_lon_to_unit_vector(0.0, 90.0);
/// assert_relative_eq!(east[1], 1.0, epsilon = 1e-12);
/// ```
#[must_use]
pub fn lat_lon_to_unit_vector(latitude_degrees: f64, longitude_degrees: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = latitude_degrees.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude_degrees.to_radians().sin_cos();
    [cos_lat * cos_lon, cos_lat * sin_lon, sin_lat]
}

/// Converts a unit vector back to `(latitude, longitude)` in degrees.
///
/// The vector does not need to be normalized; only its direction is used.
///
/// # Examples
///
/// ```
/// use approx::assert_relative_eq;
/// use orthtree_delaunay::geometry::util::unit_vector_to_lat_lon;
///
/// let (lat, lon) = unit_vector_to_lat_lon(&[0.0, 2.0, 0.0]);
/// assert_relative_eq!(lat, 0.0, epsilon = 1e-12);
/// assert_relative_eq!(lon, 90.0, epsilon = 1e-12);
/// ```
#[must_use]
pub fn unit_vector_to_lat_lon(v: &[f64; 3]) -> (f64, f64) {
    let horizontal = v[0].hypot(v[1]);
    let latitude = v[2].atan2(horizontal).to_degrees();
    let longitude = v[1].atan2(v[0]).to_degrees();
    (latitude, longitude)
}

/// Angle in radians between two direction vectors.
///
/// Computed as `atan2(|a × b|, a · b)`, which stays accurate for nearly
/// parallel and nearly antipodal directions where `acos` loses precision.
#[must_use]
pub fn angle_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let c = super::norms::cross(a, b);
    hypot(&c).atan2(super::norms::dot(a, b))
}

/// Converts a count to `f64` for averaging and density computations.
///
/// Returns `None` only if the value cannot be represented, which does not
/// happen for `usize` on supported platforms but keeps the conversion explicit.
#[inline]
#[must_use]
pub fn count_to_f64(count: usize) -> Option<f64> {
    <f64 as NumCast>::from(count)
}

/// Converts a non-negative, finite `f64` to a bucket number by flooring.
///
/// Returns `None` for negative, NaN, or out-of-range input.
#[inline]
#[must_use]
pub fn floor_to_u64(value: f64) -> Option<u64> {
    if value.is_nan() || value < 0.0 {
        return None;
    }
    <u64 as NumCast>::from(value.floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lat_lon_round_trip_for_known_locations() {
        for &(lat, lon) in &[(0.0, 0.0), (45.0, -120.0), (-33.9, 151.2), (89.0, 179.0)] {
            let v = lat_lon_to_unit_vector(lat, lon);
            assert_relative_eq!(hypot(&v), 1.0, epsilon = 1e-12);
            let (lat2, lon2) = unit_vector_to_lat_lon(&v);
            assert_relative_eq!(lat, lat2, epsilon = 1e-9);
            assert_relative_eq!(lon, lon2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_angle_between_axes() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert_relative_eq!(angle_between(&x, &y), std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(angle_between(&x, &x), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            angle_between(&x, &[-1.0, 0.0, 0.0]),
            std::f64::consts::PI,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_floor_to_u64_rejects_invalid_input() {
        assert_eq!(floor_to_u64(3.7), Some(3));
        assert_eq!(floor_to_u64(0.0), Some(0));
        assert_eq!(floor_to_u64(-0.5), None);
        assert_eq!(floor_to_u64(f64::NAN), None);
        assert_eq!(count_to_f64(12), Some(12.0));
    }
}
