//! Random point generation functions.
//!
//! Seeded generators for reproducible test and benchmark inputs: uniform
//! points in a `D`-dimensional box and uniform points on the sphere given as
//! latitude/longitude pairs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geometry::point::LatLon;

use super::RandomPointGenerationError;

fn validate_range(range: (f64, f64)) -> Result<(), RandomPointGenerationError> {
    if !range.0.is_finite() || !range.1.is_finite() || range.0 >= range.1 {
        return Err(RandomPointGenerationError::InvalidRange {
            min: range.0,
            max: range.1,
        });
    }
    Ok(())
}

/// Generate random points in `D`-dimensional space from an existing RNG.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if `range.0 >= range.1`
/// or either end is not finite.
pub fn generate_random_points_with_rng<R: Rng + ?Sized, const D: usize>(
    rng: &mut R,
    n_points: usize,
    range: (f64, f64),
) -> Result<Vec<[f64; D]>, RandomPointGenerationError> {
    validate_range(range)?;
    Ok((0..n_points)
        .map(|_| [0.0; D].map(|_| rng.random_range(range.0..range.1)))
        .collect())
}

/// Generate random points with a seeded RNG for reproducible results.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if `range.0 >= range.1`
/// or either end is not finite.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::generate_random_points_seeded;
///
/// let points1 = generate_random_points_seeded::<3>(100, (-5.0, 5.0), 42).unwrap();
/// let points2 = generate_random_points_seeded::<3>(100, (-5.0, 5.0), 42).unwrap();
/// assert_eq!(points1, points2);
///
/// let points3 = generate_random_points_seeded::<3>(100, (-5.0, 5.0), 123).unwrap();
/// assert_ne!(points1, points3);
///
/// assert!(generate_random_points_seeded::<2>(10, (1.0, -1.0), 7).is_err());
/// ```
pub fn generate_random_points_seeded<const D: usize>(
    n_points: usize,
    range: (f64, f64),
    seed: u64,
) -> Result<Vec<[f64; D]>, RandomPointGenerationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_random_points_with_rng(&mut rng, n_points, range)
}

/// Generate points distributed uniformly over the whole sphere.
///
/// Latitude is drawn as `asin(u)` for uniform `u ∈ [-1, 1)` so that the
/// density per unit area is constant; longitude is uniform in `[-180, 180)`.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::util::generate_random_lat_lon_seeded;
///
/// let points = generate_random_lat_lon_seeded(50, 7);
/// assert_eq!(points.len(), 50);
/// assert!(points.iter().all(|p| (-90.0..=90.0).contains(&p.latitude)));
/// assert_eq!(points, generate_random_lat_lon_seeded(50, 7));
/// ```
#[must_use]
pub fn generate_random_lat_lon_seeded(n_points: usize, seed: u64) -> Vec<LatLon> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_points)
        .map(|_| {
            let u: f64 = rng.random_range(-1.0..1.0);
            let longitude = rng.random_range(-180.0..180.0);
            LatLon::new(u.asin().to_degrees(), longitude)
        })
        .collect()
}

/// Generate points uniformly distributed in a spherical cap.
///
/// The cap is centred on `center` and extends `max_angle_degrees` in every
/// direction. Useful for regional inputs where the data does not wrap the
/// globe.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if the angle is not in
/// `(0, 180]`.
pub fn generate_random_lat_lon_in_cap_seeded(
    n_points: usize,
    center: LatLon,
    max_angle_degrees: f64,
    seed: u64,
) -> Result<Vec<LatLon>, RandomPointGenerationError> {
    if !(max_angle_degrees > 0.0 && max_angle_degrees <= 180.0) {
        return Err(RandomPointGenerationError::InvalidRange {
            min: 0.0,
            max: max_angle_degrees,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let cos_max = max_angle_degrees.to_radians().cos();
    let (sin_lat0, cos_lat0) = center.latitude.to_radians().sin_cos();
    let lon0 = center.longitude.to_radians();

    Ok((0..n_points)
        .map(|_| {
            // Uniform in cos(distance) gives uniform area density in the cap.
            let cos_d: f64 = rng.random_range(cos_max..=1.0);
            let d = cos_d.clamp(-1.0, 1.0).acos();
            let bearing = rng.random_range(0.0..std::f64::consts::TAU);
            let (sin_d, cos_d) = d.sin_cos();
            let (sin_b, cos_b) = bearing.sin_cos();

            let sin_lat = sin_lat0.mul_add(cos_d, cos_lat0 * sin_d * cos_b);
            let lat = sin_lat.clamp(-1.0, 1.0).asin();
            let lon = lon0 + (sin_b * sin_d * cos_lat0).atan2(sin_lat0.mul_add(-sin_lat, cos_d));

            let mut lon_degrees = lon.to_degrees();
            if lon_degrees >= 180.0 {
                lon_degrees -= 360.0;
            } else if lon_degrees < -180.0 {
                lon_degrees += 360.0;
            }
            LatLon::new(lat.to_degrees(), lon_degrees)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::util::conversions::{angle_between, lat_lon_to_unit_vector};

    #[test]
    fn test_random_points_stay_in_range() {
        let points = generate_random_points_seeded::<4>(500, (-2.0, 3.0), 11).unwrap();
        assert_eq!(points.len(), 500);
        for p in &points {
            assert!(p.iter().all(|&x| (-2.0..3.0).contains(&x)));
        }
    }

    #[test]
    fn test_invalid_ranges_are_rejected() {
        assert!(generate_random_points_seeded::<2>(1, (0.0, 0.0), 1).is_err());
        assert!(generate_random_points_seeded::<2>(1, (f64::NAN, 1.0), 1).is_err());
        assert!(
            generate_random_lat_lon_in_cap_seeded(1, LatLon::new(0.0, 0.0), 0.0, 1).is_err()
        );
        assert!(
            generate_random_lat_lon_in_cap_seeded(1, LatLon::new(0.0, 0.0), 181.0, 1).is_err()
        );
    }

    #[test]
    fn test_cap_points_stay_within_angle() {
        let center = LatLon::new(40.0, -100.0);
        let c = lat_lon_to_unit_vector(center.latitude, center.longitude);
        let points = generate_random_lat_lon_in_cap_seeded(300, center, 15.0, 5).unwrap();
        for p in points {
            assert!((-180.0..180.0).contains(&p.longitude));
            let v = lat_lon_to_unit_vector(p.latitude, p.longitude);
            assert!(angle_between(&c, &v).to_degrees() <= 15.0 + 1e-9);
        }
    }
}
