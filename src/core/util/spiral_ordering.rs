//! Centroid-outward spiral ordering of input points.
//!
//! Points are bucketed into concentric rings of equal width around the
//! centroid and sorted by `(ring, azimuth)`. Inserting in this order keeps
//! every new point next to points inserted shortly before it, so each
//! insertion only disturbs a small, local cavity.
//!
//! The ring width is the side of the square cell each point would occupy if
//! the area covered by the input were shared evenly among all points. The
//! surface-specific parts (centroid, polar frame, covered area) come from a
//! [`SurfaceKernel`].

use ordered_float::OrderedFloat;

use crate::geometry::kernel::SurfaceKernel;
use crate::geometry::util::floor_to_u64;

/// Spiral insertion order together with the polar frame it was computed in.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::util::SpiralOrdering;
/// use orthtree_delaunay::geometry::kernel::PlanarKernel;
///
/// let positions = [[10.0, 0.0], [0.0, 0.0], [-1.0, 0.0], [1.0, 0.0], [0.0, -10.0]];
/// let spiral = SpiralOrdering::new(&PlanarKernel, &positions);
///
/// // Points near the centroid come first, far points last.
/// let first = spiral.order()[0];
/// assert!([1, 2, 3].contains(&first));
/// assert_eq!(spiral.order().len(), positions.len());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SpiralOrdering<const D: usize> {
    order: Vec<usize>,
    centroid: [f64; D],
    max_radial: f64,
    step: f64,
}

impl<const D: usize> SpiralOrdering<D> {
    /// Computes the spiral order of `positions`.
    ///
    /// Ties (same ring and azimuth) keep input order, so the result is
    /// deterministic.
    #[must_use]
    pub fn new<K: SurfaceKernel<D>>(kernel: &K, positions: &[[f64; D]]) -> Self {
        let centroid = kernel.centroid(positions);
        let polar = kernel.polar_coordinates(&centroid, positions);
        let max_radial = polar
            .iter()
            .map(|&(radial, _)| radial)
            .fold(0.0_f64, f64::max);
        let step = kernel.step_size(max_radial, positions.len());

        let mut keyed: Vec<(u64, OrderedFloat<f64>, usize)> = polar
            .iter()
            .enumerate()
            .map(|(index, &(radial, azimuth))| {
                let ring = if step > 0.0 {
                    floor_to_u64(radial / step).unwrap_or(0)
                } else {
                    0
                };
                (ring, OrderedFloat(azimuth), index)
            })
            .collect();
        keyed.sort_unstable();

        Self {
            order: keyed.into_iter().map(|(_, _, index)| index).collect(),
            centroid,
            max_radial,
            step,
        }
    }

    /// Input indices in insertion order.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Consumes the ordering, returning the input indices.
    #[must_use]
    pub fn into_order(self) -> Vec<usize> {
        self.order
    }

    /// Centroid used as the polar origin.
    #[must_use]
    pub const fn centroid(&self) -> &[f64; D] {
        &self.centroid
    }

    /// Largest radial distance of any input point from the centroid.
    #[must_use]
    pub const fn max_radial(&self) -> f64 {
        self.max_radial
    }

    /// Ring width.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }
}
