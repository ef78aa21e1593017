//! Input point abstractions for the triangulation solvers.
//!
//! The solvers never copy or inspect caller-owned points beyond reading their
//! coordinates; output edges and triangles borrow the caller's values. These
//! traits are the read-only view the solvers need.

use std::fmt;

// =============================================================================
// PLANAR POINTS
// =============================================================================

/// A point in the plane.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::geometry::point::PlanarPoint;
///
/// struct Site {
///     east: f64,
///     north: f64,
/// }
///
/// impl PlanarPoint for Site {
///     fn x(&self) -> f64 {
///         self.east
///     }
///     fn y(&self) -> f64 {
///         self.north
///     }
/// }
///
/// let site = Site { east: 3.0, north: 4.0 };
/// assert_eq!(site.coords(), [3.0, 4.0]);
/// ```
pub trait PlanarPoint {
    /// Horizontal coordinate.
    fn x(&self) -> f64;

    /// Vertical coordinate.
    fn y(&self) -> f64;

    /// Coordinates as an array.
    fn coords(&self) -> [f64; 2] {
        [self.x(), self.y()]
    }
}

impl PlanarPoint for [f64; 2] {
    fn x(&self) -> f64 {
        self[0]
    }

    fn y(&self) -> f64 {
        self[1]
    }
}

impl PlanarPoint for (f64, f64) {
    fn x(&self) -> f64 {
        self.0
    }

    fn y(&self) -> f64 {
        self.1
    }
}

impl<P: PlanarPoint + ?Sized> PlanarPoint for &P {
    fn x(&self) -> f64 {
        (**self).x()
    }

    fn y(&self) -> f64 {
        (**self).y()
    }
}

// =============================================================================
// GEOGRAPHIC POINTS
// =============================================================================

/// A point on the globe, in degrees.
///
/// Latitude is expected in `[-90, 90]` and longitude in `[-180, 180]`; values
/// outside those ranges are accepted and simply wrap through the trigonometry.
pub trait GeoPoint {
    /// Latitude in degrees, positive north.
    fn latitude_degrees(&self) -> f64;

    /// Longitude in degrees, positive east.
    fn longitude_degrees(&self) -> f64;
}

/// A plain latitude/longitude pair in degrees.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::geometry::point::{GeoPoint, LatLon};
///
/// let zurich = LatLon::new(47.37, 8.54);
/// assert_eq!(zurich.latitude_degrees(), 47.37);
/// assert_eq!(zurich.longitude_degrees(), 8.54);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl LatLon {
    /// Creates a new latitude/longitude pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.latitude, self.longitude)
    }
}

impl GeoPoint for LatLon {
    fn latitude_degrees(&self) -> f64 {
        self.latitude
    }

    fn longitude_degrees(&self) -> f64 {
        self.longitude
    }
}

impl<P: GeoPoint + ?Sized> GeoPoint for &P {
    fn latitude_degrees(&self) -> f64 {
        (**self).latitude_degrees()
    }

    fn longitude_degrees(&self) -> f64 {
        (**self).longitude_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_point_impls_agree() {
        let array = [1.5, -2.0];
        let tuple = (1.5, -2.0);
        assert_eq!(array.coords(), tuple.coords());
        assert_eq!((&array).x(), 1.5);
    }

    #[test]
    fn test_lat_lon_display() {
        let p = LatLon::new(1.0, -2.5);
        assert_eq!(p.to_string(), "(1.000000°, -2.500000°)");
        assert_eq!((&p).longitude_degrees(), -2.5);
    }
}
