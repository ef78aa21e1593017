//! Query shapes and the node volumes they are tested against.
//!
//! A [`Shape`] answers two questions: whether a single stored member matches,
//! and how the shape relates to a whole node volume ([`Intersection`]). The
//! second answer lets range queries skip disjoint subtrees and collect fully
//! covered subtrees without testing every member.
//!
//! # Square-root-free sphere tests
//!
//! Sphere classification compares sums of Euclidean lengths while only squared
//! lengths are at hand. [`sqrt_sum_less`] decides `√a + √b < √c` exactly from
//! `a`, `b` and `c`:
//!
//! ```text
//! √a + √b < √c  ⇔  (c − a − b ≥ 0) ∧ (4ab < (c − a − b)²)
//! ```
//!
//! Squaring `√a + √b < √c` gives `a + b + 2√(ab) < c`, i.e. `2√(ab) < c − a − b`,
//! which holds iff the right side is non-negative and its square exceeds `4ab`.

use crate::geometry::util::squared_distance;

/// Relation between a query shape and a node volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// No member stored in the volume can match.
    None,
    /// Some members may match; test them individually.
    Partial,
    /// Every member stored in the volume matches.
    Complete,
}

/// Decides `√a + √b < √c` for non-negative `a`, `b`, `c` without square roots.
///
/// Returns `false` for NaN input.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::shape::sqrt_sum_less;
///
/// // 1 + 2 < 4
/// assert!(sqrt_sum_less(1.0, 4.0, 16.0));
/// // 1 + 2 == 3 is not strictly less
/// assert!(!sqrt_sum_less(1.0, 4.0, 9.0));
/// // 2 + 2 > 3
/// assert!(!sqrt_sum_less(4.0, 4.0, 9.0));
/// ```
#[inline]
#[must_use]
pub fn sqrt_sum_less(a: f64, b: f64, c: f64) -> bool {
    let slack = c - a - b;
    slack >= 0.0 && 4.0 * a * b < slack * slack
}

// =============================================================================
// BOUNDING REGION
// =============================================================================

/// Axis-aligned node volume with its split point and bounding sphere.
///
/// `center` is the point at which the volume splits into `2^D` orthants; a
/// position goes to the child whose index has bit `i` set iff
/// `position[i] >= center[i]`. `square_radius` is the squared radius of a
/// sphere around `center` that encloses the whole box.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingRegion<const D: usize> {
    lower: [f64; D],
    upper: [f64; D],
    center: [f64; D],
    square_radius: f64,
}

impl<const D: usize> BoundingRegion<D> {
    /// Creates a region with an explicit split point.
    #[must_use]
    pub fn with_center(lower: [f64; D], upper: [f64; D], center: [f64; D]) -> Self {
        let square_radius = (0..D).fold(0.0, |acc, i| {
            let half = (center[i] - lower[i]).max(upper[i] - center[i]);
            half.mul_add(half, acc)
        });
        Self {
            lower,
            upper,
            center,
            square_radius,
        }
    }

    /// Creates a region split at its midpoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use orthtree_delaunay::geometry::shape::BoundingRegion;
    ///
    /// let region = BoundingRegion::from_bounds([0.0, 0.0], [4.0, 2.0]);
    /// assert_eq!(region.center(), &[2.0, 1.0]);
    /// assert_eq!(region.square_radius(), 5.0);
    /// ```
    #[must_use]
    pub fn from_bounds(lower: [f64; D], upper: [f64; D]) -> Self {
        let mut center = [0.0; D];
        for (i, c) in center.iter_mut().enumerate() {
            *c = lower[i] + (upper[i] - lower[i]) / 2.0;
        }
        Self::with_center(lower, upper, center)
    }

    /// Lower corner.
    #[must_use]
    pub const fn lower(&self) -> &[f64; D] {
        &self.lower
    }

    /// Upper corner.
    #[must_use]
    pub const fn upper(&self) -> &[f64; D] {
        &self.upper
    }

    /// Split point.
    #[must_use]
    pub const fn center(&self) -> &[f64; D] {
        &self.center
    }

    /// Squared radius of the enclosing sphere around [`center`](Self::center).
    #[must_use]
    pub const fn square_radius(&self) -> f64 {
        self.square_radius
    }

    /// Returns `true` if `position` lies in the closed box.
    #[must_use]
    pub fn contains(&self, position: &[f64; D]) -> bool {
        (0..D).all(|i| self.lower[i] <= position[i] && position[i] <= self.upper[i])
    }

    /// Returns `true` if `other` lies entirely within this closed box.
    #[must_use]
    pub fn encloses(&self, other: &Self) -> bool {
        (0..D).all(|i| self.lower[i] <= other.lower[i] && other.upper[i] <= self.upper[i])
    }

    /// Index of the orthant containing `position`.
    #[must_use]
    pub fn child_index(&self, position: &[f64; D]) -> usize {
        (0..D).fold(0, |index, i| {
            if position[i] >= self.center[i] {
                index | (1 << i)
            } else {
                index
            }
        })
    }

    /// Region of the orthant with the given index, split at its midpoint.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut lower = self.lower;
        let mut upper = self.upper;
        for i in 0..D {
            if index & (1 << i) == 0 {
                upper[i] = self.center[i];
            } else {
                lower[i] = self.center[i];
            }
        }
        Self::from_bounds(lower, upper)
    }

    /// Returns `true` if every axis has room for a split strictly inside the box.
    ///
    /// Once an axis has shrunk to adjacent floating-point values its midpoint
    /// coincides with an endpoint, and further splitting could never separate
    /// the positions stored there.
    #[must_use]
    pub fn can_subdivide(&self) -> bool {
        (0..D).all(|i| self.lower[i] < self.center[i] && self.center[i] < self.upper[i])
    }

    /// Region twice as wide on every axis, grown towards `position`.
    ///
    /// Returns the grown region together with the orthant index that `self`
    /// occupies inside it. The grown region splits exactly at the old
    /// boundary, so `self` is bit-for-bit that orthant's box.
    #[must_use]
    pub fn grow_towards(&self, position: &[f64; D]) -> (Self, usize) {
        let mut lower = self.lower;
        let mut upper = self.upper;
        let mut center = [0.0; D];
        let mut index = 0;
        for i in 0..D {
            let side = self.upper[i] - self.lower[i];
            if position[i] < self.lower[i] {
                lower[i] = self.lower[i] - side;
                center[i] = self.lower[i];
                index |= 1 << i;
            } else {
                upper[i] = self.upper[i] + side;
                center[i] = self.upper[i];
            }
        }
        (Self::with_center(lower, upper, center), index)
    }

    /// Smallest squared distance from `position` to any point of the box.
    #[must_use]
    pub fn min_squared_distance(&self, position: &[f64; D]) -> f64 {
        (0..D).fold(0.0, |acc, i| {
            let gap = if position[i] < self.lower[i] {
                self.lower[i] - position[i]
            } else if position[i] > self.upper[i] {
                position[i] - self.upper[i]
            } else {
                0.0
            };
            gap.mul_add(gap, acc)
        })
    }
}

// =============================================================================
// SHAPES
// =============================================================================

/// A query region for [`SpatialIndex`](crate::core::spatial_index::SpatialIndex)
/// range queries.
pub trait Shape<const D: usize> {
    /// Returns `true` if a member stored at `position` with the given member
    /// radius matches the query.
    fn contains(&self, position: &[f64; D], member_radius: f64) -> bool;

    /// Classifies a node volume whose members have radii at most
    /// `max_member_radius`.
    ///
    /// `None` and `Complete` must be conservative: `None` only if no member can
    /// match, `Complete` only if every member matches.
    fn classify(&self, region: &BoundingRegion<D>, max_member_radius: f64) -> Intersection;
}

/// Open ball around a point.
///
/// A member matches when the distance from its position to the center is
/// strictly less than the sphere radius plus the member radius. Plain point
/// members (radius 0) thus match exactly when they lie strictly inside.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::shape::{Shape, Sphere};
///
/// let sphere = Sphere::new([0.0, 0.0], 1.0);
/// assert!(sphere.contains(&[0.5, 0.5], 0.0));
/// assert!(!sphere.contains(&[1.0, 0.0], 0.0));
/// assert!(sphere.contains(&[1.5, 0.0], 0.75));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere<const D: usize> {
    center: [f64; D],
    radius: f64,
}

impl<const D: usize> Sphere<D> {
    /// Creates a sphere. Validation happens at the index boundary.
    #[must_use]
    pub const fn new(center: [f64; D], radius: f64) -> Self {
        Self { center, radius }
    }

    /// Center of the sphere.
    #[must_use]
    pub const fn center(&self) -> &[f64; D] {
        &self.center
    }

    /// Radius of the sphere.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }
}

impl<const D: usize> Shape<D> for Sphere<D> {
    fn contains(&self, position: &[f64; D], member_radius: f64) -> bool {
        let reach = self.radius + member_radius;
        squared_distance(position, &self.center) < reach * reach
    }

    fn classify(&self, region: &BoundingRegion<D>, max_member_radius: f64) -> Intersection {
        let square_distance = squared_distance(region.center(), &self.center);
        let reach = self.radius + max_member_radius;

        if sqrt_sum_less(reach * reach, region.square_radius(), square_distance) {
            Intersection::None
        } else if sqrt_sum_less(
            square_distance,
            region.square_radius(),
            self.radius * self.radius,
        ) {
            Intersection::Complete
        } else {
            Intersection::Partial
        }
    }
}

/// Closed axis-aligned box `lower ≤ p ≤ upper`.
///
/// Member radii are ignored: only the stored position is tested.
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::geometry::shape::{Rectanguloid, Shape};
///
/// let query = Rectanguloid::new([0.0, 0.0], [1.0, 2.0]);
/// assert!(query.contains(&[1.0, 2.0], 0.0));
/// assert!(!query.contains(&[1.1, 0.0], 0.0));
/// assert!(!Rectanguloid::new([1.0], [0.0]).is_valid());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectanguloid<const D: usize> {
    lower: [f64; D],
    upper: [f64; D],
}

impl<const D: usize> Rectanguloid<D> {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(lower: [f64; D], upper: [f64; D]) -> Self {
        Self { lower, upper }
    }

    /// Returns `false` if the box is empty on some axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self.lower[i] <= self.upper[i])
    }

    /// Lower corner.
    #[must_use]
    pub const fn lower(&self) -> &[f64; D] {
        &self.lower
    }

    /// Upper corner.
    #[must_use]
    pub const fn upper(&self) -> &[f64; D] {
        &self.upper
    }
}

impl<const D: usize> Shape<D> for Rectanguloid<D> {
    fn contains(&self, position: &[f64; D], _member_radius: f64) -> bool {
        (0..D).all(|i| self.lower[i] <= position[i] && position[i] <= self.upper[i])
    }

    fn classify(&self, region: &BoundingRegion<D>, _max_member_radius: f64) -> Intersection {
        let mut complete = true;
        for i in 0..D {
            if region.upper()[i] < self.lower[i] || region.lower()[i] > self.upper[i] {
                return Intersection::None;
            }
            if region.lower()[i] < self.lower[i] || region.upper()[i] > self.upper[i] {
                complete = false;
            }
        }
        if complete {
            Intersection::Complete
        } else {
            Intersection::Partial
        }
    }
}
