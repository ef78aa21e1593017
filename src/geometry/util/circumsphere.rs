//! Circumcircle calculations for planar and spherical triangles.
//!
//! Both variants return the circum-shape as a center plus a Euclidean radius
//! in the embedding space, which is what the spatial index stores for every
//! live triangle. A point lies strictly inside the circum-shape exactly when
//! its Euclidean distance to the center is below the radius.

use super::norms::{cross, hypot, normalize, subtract};

/// Center and radius of a triangle's circum-shape in `D`-dimensional
/// embedding space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circumcircle<const D: usize> {
    /// Circumcenter (for spherical triangles, a point on the unit sphere).
    pub center: [f64; D],
    /// Euclidean radius around [`center`](Self::center).
    pub radius: f64,
}

impl<const D: usize> Circumcircle<D> {
    /// Returns `true` if both center and radius are finite.
    ///
    /// Collinear (or coincident) vertices produce a non-finite circum-shape.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.radius.is_finite() && self.center.iter().all(|x| x.is_finite())
    }

    /// Returns `true` if `point` lies strictly inside the circum-shape.
    #[must_use]
    pub fn contains(&self, point: &[f64; D]) -> bool {
        hypot(&subtract(point, &self.center)) < self.radius
    }
}

/// Circumcircle of a planar triangle.
///
/// The center is the intersection of the perpendicular bisectors of `ab` and
/// `ac`, solved relative to `a` to keep the arithmetic well scaled. The
/// result is independent of vertex order.
///
/// Collinear input yields a division by zero and therefore a non-finite
/// result; callers check [`Circumcircle::is_finite`].
///
/// # Examples
///
/// ```
/// use approx::assert_relative_eq;
/// use orthtree_delaunay::geometry::util::planar_circumcircle;
///
/// let circle = planar_circumcircle(&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0]);
/// assert_relative_eq!(circle.center[0], 1.0);
/// assert_relative_eq!(circle.center[1], 1.0);
/// assert_relative_eq!(circle.radius, 2.0_f64.sqrt());
///
/// let collinear = planar_circumcircle(&[0.0, 0.0], &[1.0, 1.0], &[2.0, 2.0]);
/// assert!(!collinear.is_finite());
/// ```
#[must_use]
pub fn planar_circumcircle(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> Circumcircle<2> {
    let [bx, by] = subtract(b, a);
    let [cx, cy] = subtract(c, a);

    let denominator = 2.0 * bx.mul_add(cy, -(by * cx));
    let b_sq = bx.mul_add(bx, by * by);
    let c_sq = cx.mul_add(cx, cy * cy);

    let ux = cy.mul_add(b_sq, -(by * c_sq)) / denominator;
    let uy = bx.mul_add(c_sq, -(cx * b_sq)) / denominator;

    Circumcircle {
        center: [a[0] + ux, a[1] + uy],
        radius: ux.hypot(uy),
    }
}

/// Circumcircle of a spherical triangle with vertices on the unit sphere.
///
/// The three vertices span a plane; its unit normal `(b − a) × (c − a)`
/// pierces the sphere at the spherical circumcenter. The normal points to the
/// side from which `a, b, c` appear counter-clockwise, so a consistently wound
/// triangulation gets the circumcenter of the cap each triangle actually
/// covers, including caps larger than a hemisphere.
///
/// The returned radius is the chord length from the center to a vertex, so
/// containment stays a plain Euclidean distance test in 3-space.
///
/// # Examples
///
/// ```
/// use approx::assert_relative_eq;
/// use orthtree_delaunay::geometry::util::spherical_circumcircle;
///
/// let x = [1.0, 0.0, 0.0];
/// let y = [0.0, 1.0, 0.0];
/// let z = [0.0, 0.0, 1.0];
/// let circle = spherical_circumcircle(&x, &y, &z);
/// let k = 1.0 / 3.0_f64.sqrt();
/// for component in circle.center {
///     assert_relative_eq!(component, k, epsilon = 1e-12);
/// }
///
/// // Reversing the winding selects the complementary cap.
/// let flipped = spherical_circumcircle(&x, &z, &y);
/// assert_relative_eq!(flipped.center[0], -k, epsilon = 1e-12);
/// ```
#[must_use]
pub fn spherical_circumcircle(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> Circumcircle<3> {
    let normal = cross(&subtract(b, a), &subtract(c, a));
    let center = normalize(&normal);
    let radius = hypot(&subtract(a, &center));
    Circumcircle { center, radius }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::util::conversions::lat_lon_to_unit_vector;
    use approx::assert_relative_eq;

    #[test]
    fn test_planar_circumcircle_is_equidistant() {
        let a = [0.3, -1.2];
        let b = [4.1, 0.7];
        let c = [-2.0, 3.3];
        let circle = planar_circumcircle(&a, &b, &c);
        assert!(circle.is_finite());
        for v in [a, b, c] {
            assert_relative_eq!(
                hypot(&subtract(&v, &circle.center)),
                circle.radius,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_planar_circumcircle_ignores_vertex_order() {
        let a = [0.0, 0.0];
        let b = [10.0, 0.0];
        let c = [0.0, 10.0];
        let forward = planar_circumcircle(&a, &b, &c);
        let backward = planar_circumcircle(&c, &b, &a);
        assert_relative_eq!(forward.center[0], backward.center[0], epsilon = 1e-12);
        assert_relative_eq!(forward.center[1], backward.center[1], epsilon = 1e-12);
        assert_relative_eq!(forward.radius, backward.radius, epsilon = 1e-12);
        assert_relative_eq!(forward.radius, 50.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_planar_contains_is_strict() {
        let circle = planar_circumcircle(&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0]);
        assert!(circle.contains(&[1.0, 1.0]));
        assert!(circle.contains(&[2.0, 1.5]));
        assert!(!circle.contains(&[3.0, 3.0]));
    }

    #[test]
    fn test_spherical_circumcircle_is_equidistant() {
        let a = lat_lon_to_unit_vector(10.0, 20.0);
        let b = lat_lon_to_unit_vector(-5.0, 40.0);
        let c = lat_lon_to_unit_vector(30.0, 35.0);
        let circle = spherical_circumcircle(&a, &b, &c);
        assert!(circle.is_finite());
        assert_relative_eq!(hypot(&circle.center), 1.0, epsilon = 1e-12);
        for v in [a, b, c] {
            assert_relative_eq!(
                hypot(&subtract(&v, &circle.center)),
                circle.radius,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_spherical_circumcircle_degenerate_is_not_finite() {
        let a = lat_lon_to_unit_vector(0.0, 0.0);
        let circle = spherical_circumcircle(&a, &a, &lat_lon_to_unit_vector(0.0, 10.0));
        assert!(!circle.is_finite());
    }
}
