//! Surface kernels for the incremental triangulation.
//!
//! The [`SurfaceKernel`] trait collects every operation in which the planar and
//! spherical triangulations differ: circum-shape computation, the centroid and
//! polar frame used for spiral ordering, and the bounding scaffold. The
//! insertion algorithm itself is written once against this trait and stays
//! purely combinatorial.

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use crate::core::collections::SmallBuffer;
use crate::geometry::util::{
    Circumcircle, angle_between, count_to_f64, cross, dot, normalize, planar_circumcircle,
    spherical_circumcircle, subtract, triple_product,
};

/// Distance from `π` below which the spherical scaffold radius is nudged.
pub const ANTIPODAL_NUDGE: f64 = 1e-3;

/// Relative padding of the planar scaffold rectangle around the input.
pub const PLANAR_SCAFFOLD_MARGIN: f64 = 0.01;

/// Synthetic vertices and seed triangles enclosing every input point.
///
/// Triangle entries index into [`vertices`](Self::vertices).
#[derive(Clone, Debug, PartialEq)]
pub struct Scaffold<const D: usize> {
    /// Scaffold vertex positions in embedding space.
    pub vertices: SmallBuffer<[f64; D], 4>,
    /// Seed triangles, wound consistently.
    pub triangles: SmallBuffer<[usize; 3], 2>,
}

/// Geometry of the surface a triangulation lives on.
///
/// Positions are embedded in `D`-dimensional Euclidean space, which is also the
/// space of the spatial index holding the circum-shapes.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::kernel::{PlanarKernel, SurfaceKernel};
///
/// let kernel = PlanarKernel;
/// let circle = kernel.circumcircle(&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0]);
/// assert!(circle.contains(&[1.0, 1.0]));
/// assert!(!circle.contains(&[3.0, 3.0]));
/// ```
pub trait SurfaceKernel<const D: usize>: Clone + std::fmt::Debug {
    /// Short name used in log events.
    const NAME: &'static str;

    /// Circum-shape of the triangle `(a, b, c)` as a Euclidean ball.
    fn circumcircle(&self, a: &[f64; D], b: &[f64; D], c: &[f64; D]) -> Circumcircle<D>;

    /// Centroid of a non-empty set of positions.
    fn centroid(&self, positions: &[[f64; D]]) -> [f64; D];

    /// `(radial distance, azimuth)` of every position relative to `centroid`.
    ///
    /// The azimuth is measured against a fixed reference direction and lies in
    /// `[-π, π]`.
    fn polar_coordinates(&self, centroid: &[f64; D], positions: &[[f64; D]]) -> Vec<(f64, f64)>;

    /// Width of one spiral ring: the side of the square cell each of `count`
    /// points would occupy if the covered area were shared evenly.
    fn step_size(&self, max_radial: f64, count: usize) -> f64;

    /// Scaffold enclosing all `positions`.
    fn scaffold(&self, positions: &[[f64; D]], centroid: &[f64; D], max_radial: f64)
    -> Scaffold<D>;

    /// Initial bounds for the circum-shape index.
    fn index_bounds(&self, scaffold: &Scaffold<D>) -> ([f64; D], [f64; D]);
}

fn step_from_area(area: f64, count: usize) -> f64 {
    count_to_f64(count).map_or(0.0, |n| if n > 0.0 { (area / n).sqrt() } else { 0.0 })
}

// =============================================================================
// PLANAR KERNEL
// =============================================================================

/// Euclidean plane; positions are `[x, y]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanarKernel;

impl SurfaceKernel<2> for PlanarKernel {
    const NAME: &'static str = "planar";

    fn circumcircle(&self, a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> Circumcircle<2> {
        planar_circumcircle(a, b, c)
    }

    fn centroid(&self, positions: &[[f64; 2]]) -> [f64; 2] {
        let n = count_to_f64(positions.len()).unwrap_or(1.0).max(1.0);
        let [sx, sy] = positions
            .iter()
            .fold([0.0, 0.0], |acc, p| [acc[0] + p[0], acc[1] + p[1]]);
        [sx / n, sy / n]
    }

    fn polar_coordinates(&self, centroid: &[f64; 2], positions: &[[f64; 2]]) -> Vec<(f64, f64)> {
        positions
            .iter()
            .map(|p| {
                let [dx, dy] = subtract(p, centroid);
                (dx.hypot(dy), dy.atan2(dx))
            })
            .collect()
    }

    fn step_size(&self, max_radial: f64, count: usize) -> f64 {
        step_from_area(PI * max_radial * max_radial, count)
    }

    fn scaffold(
        &self,
        positions: &[[f64; 2]],
        _centroid: &[f64; 2],
        _max_radial: f64,
    ) -> Scaffold<2> {
        let mut lower = [f64::INFINITY; 2];
        let mut upper = [f64::NEG_INFINITY; 2];
        for p in positions {
            for axis in 0..2 {
                lower[axis] = lower[axis].min(p[axis]);
                upper[axis] = upper[axis].max(p[axis]);
            }
        }

        let extent = (upper[0] - lower[0]).max(upper[1] - lower[1]);
        let margin = if extent > 0.0 {
            PLANAR_SCAFFOLD_MARGIN * extent
        } else {
            1.0
        };
        let (x0, y0) = (lower[0] - margin, lower[1] - margin);
        let (x1, y1) = (upper[0] + margin, upper[1] + margin);

        Scaffold {
            vertices: [[x0, y0], [x1, y0], [x1, y1], [x0, y1]].into_iter().collect(),
            triangles: [[0, 1, 2], [0, 2, 3]].into_iter().collect(),
        }
    }

    fn index_bounds(&self, scaffold: &Scaffold<2>) -> ([f64; 2], [f64; 2]) {
        let mut lower = [f64::INFINITY; 2];
        let mut upper = [f64::NEG_INFINITY; 2];
        for v in &scaffold.vertices {
            for axis in 0..2 {
                lower[axis] = lower[axis].min(v[axis]);
                upper[axis] = upper[axis].max(v[axis]);
            }
        }
        (lower, upper)
    }
}

// =============================================================================
// SPHERICAL KERNEL
// =============================================================================

/// Unit sphere embedded in 3-space; positions are unit vectors.
///
/// Distances in the polar frame are angles in radians; circum-shape radii are
/// chord lengths so that containment is a Euclidean test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SphericalKernel;

impl SphericalKernel {
    /// Orthonormal tangent basis `(e1, e2)` at the unit vector `c`.
    ///
    /// `e1` is the projection of the z-axis (or the x-axis when `c` is within
    /// about 25° of a pole) onto the tangent plane; `e2 = c × e1`, so that
    /// `(e1, e2, c)` is right-handed.
    #[must_use]
    pub fn tangent_basis(c: &[f64; 3]) -> ([f64; 3], [f64; 3]) {
        let reference = if c[2].abs() > 0.9 {
            [1.0, 0.0, 0.0]
        } else {
            [0.0, 0.0, 1.0]
        };
        let along = dot(&reference, c);
        let e1 = normalize(&[
            along.mul_add(-c[0], reference[0]),
            along.mul_add(-c[1], reference[1]),
            along.mul_add(-c[2], reference[2]),
        ]);
        let e2 = cross(c, &e1);
        (e1, e2)
    }

    /// Angular radius of the scaffold triangle for data within `max_angle` of
    /// the centroid.
    ///
    /// A spherical triangle whose vertices lie at angle `R` from its center in
    /// directions 120° apart has inradius `r` with `tan r = tan(R) / 2`. For
    /// small data caps the angle is padded by half again plus `10⁻³` before
    /// solving for `R`; wide caps use `R = (π + θ) / 2`, which places the
    /// vertices beyond the hemisphere.
    #[must_use]
    pub fn scaffold_angle(max_angle: f64) -> f64 {
        let mut theta = max_angle;
        if theta > PI - ANTIPODAL_NUDGE {
            tracing::warn!(
                max_angle,
                "input spans nearly the whole sphere; nudging scaffold radius"
            );
            theta = PI - ANTIPODAL_NUDGE;
        }
        if theta < FRAC_PI_4 {
            let padded = 1.5f64.mul_add(theta, ANTIPODAL_NUDGE);
            (2.0 * padded.tan()).atan()
        } else {
            (PI + theta) / 2.0
        }
    }
}

impl SurfaceKernel<3> for SphericalKernel {
    const NAME: &'static str = "spherical";

    fn circumcircle(&self, a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> Circumcircle<3> {
        spherical_circumcircle(a, b, c)
    }

    fn centroid(&self, positions: &[[f64; 3]]) -> [f64; 3] {
        let sum = positions.iter().fold([0.0; 3], |acc, p| {
            [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
        });
        let centroid = normalize(&sum);
        if centroid.iter().all(|x| x.is_finite()) {
            return centroid;
        }
        // Balanced input (e.g. antipodal pairs) has no mean direction.
        tracing::debug!("vector sum of input vanishes; using first point as centroid");
        positions
            .first()
            .map_or([0.0, 0.0, 1.0], normalize)
    }

    fn polar_coordinates(&self, centroid: &[f64; 3], positions: &[[f64; 3]]) -> Vec<(f64, f64)> {
        let (e1, e2) = Self::tangent_basis(centroid);
        positions
            .iter()
            .map(|p| (angle_between(centroid, p), dot(p, &e2).atan2(dot(p, &e1))))
            .collect()
    }

    fn step_size(&self, max_radial: f64, count: usize) -> f64 {
        step_from_area(TAU * (1.0 - max_radial.cos()), count)
    }

    fn scaffold(
        &self,
        _positions: &[[f64; 3]],
        centroid: &[f64; 3],
        max_radial: f64,
    ) -> Scaffold<3> {
        let radius = Self::scaffold_angle(max_radial);
        let (sin_r, cos_r) = radius.sin_cos();
        let (e1, e2) = Self::tangent_basis(centroid);

        let mut vertices: SmallBuffer<[f64; 3], 4> = (0..3_u32)
            .map(|k| {
                let (sin_a, cos_a) = (TAU * f64::from(k) / 3.0).sin_cos();
                let mut v = [0.0; 3];
                for axis in 0..3 {
                    let tangent = cos_a.mul_add(e1[axis], sin_a * e2[axis]);
                    v[axis] = cos_r.mul_add(centroid[axis], sin_r * tangent);
                }
                normalize(&v)
            })
            .collect();

        let normal = cross(
            &subtract(&vertices[1], &vertices[0]),
            &subtract(&vertices[2], &vertices[0]),
        );
        if dot(&normal, centroid) < 0.0 {
            vertices.swap(1, 2);
        }

        Scaffold {
            vertices,
            triangles: [[0, 1, 2]].into_iter().collect(),
        }
    }

    fn index_bounds(&self, _scaffold: &Scaffold<3>) -> ([f64; 3], [f64; 3]) {
        ([-1.0; 3], [1.0; 3])
    }
}

/// Orientation of a spherical triangle relative to a reference direction.
///
/// Positive when `(b − a) × (c − a)` points to the same side as `reference`.
#[must_use]
pub fn spherical_winding(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3], reference: &[f64; 3]) -> f64 {
    triple_product(reference, &subtract(b, a), &subtract(c, a))
}
