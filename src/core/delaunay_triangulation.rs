//! Delaunay triangulation solvers for planar and geographic point sets.
//!
//! [`PlanarDelaunay`] triangulates points in the plane and
//! [`SphericalDelaunay`] triangulates latitude/longitude points on the unit
//! sphere. Both reorder the input along a centroid-outward spiral, enclose it
//! in a scaffold and run the shared incremental
//! [`BowyerWatson`](crate::core::algorithms::bowyer_watson::BowyerWatson)
//! engine. Results borrow the caller's points; scaffold vertices never appear
//! in the output.
//!
//! # Examples
//!
//! ```rust
//! use orthtree_delaunay::core::delaunay_triangulation::PlanarDelaunay;
//!
//! let points = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
//! let edges = PlanarDelaunay::new().solve(&points).unwrap();
//! assert_eq!(edges.len(), 3);
//! assert!(edges.iter().all(|(a, b)| a != b));
//! ```

use thiserror::Error;

use crate::core::algorithms::bowyer_watson::BowyerWatson;
use crate::core::operations::InsertionStatistics;
use crate::core::spatial_index::{ConfigurationError, DEFAULT_LEAF_SIZE, SpatialIndexError};
use crate::core::util::SpiralOrdering;
use crate::geometry::kernel::{PlanarKernel, SphericalKernel, SurfaceKernel};
use crate::geometry::point::{GeoPoint, PlanarPoint};
use crate::geometry::util::lat_lon_to_unit_vector;

/// Smallest input a triangulation accepts.
pub const MIN_TRIANGULATION_POINTS: usize = 3;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while triangulating.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TriangulationError {
    /// Fewer points than a single triangle needs.
    #[error("Triangulation needs at least {required} points, got {actual}")]
    InsufficientPoints {
        /// Number of points supplied.
        actual: usize,
        /// Minimum number of points.
        required: usize,
    },
    /// An input point has a non-finite coordinate.
    #[error("Input point {index} has a non-finite coordinate")]
    NonFinitePoint {
        /// Position of the point in the input slice.
        index: usize,
    },
    /// A geographic input point has a latitude outside `[-90, 90]`.
    #[error("Input point {index} has latitude {latitude}, outside [-90, 90]")]
    InvalidLatitude {
        /// Position of the point in the input slice.
        index: usize,
        /// The offending latitude in degrees.
        latitude: f64,
    },
    /// The circum-shape index rejected an operation, typically because a new
    /// triangle was degenerate and its circumcenter non-finite.
    #[error("Circum-shape index error: {0}")]
    Index(#[from] SpatialIndexError),
    /// The circum-shape index could not be configured.
    #[error("Circum-shape index configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Triangle, edge and index bookkeeping disagree.
    #[error("Triangulation bookkeeping error: {message}")]
    Bookkeeping {
        /// Description of the inconsistency.
        message: String,
    },
}

// =============================================================================
// OPTIONS AND OUTPUT
// =============================================================================

/// Tuning knobs shared by both solvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolverOptions {
    /// Leaf size of the internal circum-shape index.
    pub leaf_size: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl SolverOptions {
    /// Returns these options with a different index leaf size.
    #[must_use]
    pub const fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }
}

/// Full result of a triangulation run.
#[derive(Debug)]
pub struct Triangulation<'a, P> {
    /// Undirected edges between input points, each once, sorted by input
    /// index pair.
    pub edges: Vec<(&'a P, &'a P)>,
    /// Triangles whose three corners are input points.
    pub triangles: Vec<[&'a P; 3]>,
    /// Insertion counters.
    pub statistics: InsertionStatistics,
}

/// Index-based result shared by both solvers.
struct IndexedTriangulation {
    edges: Vec<(usize, usize)>,
    triangles: Vec<[usize; 3]>,
    statistics: InsertionStatistics,
}

impl IndexedTriangulation {
    fn resolve<P>(self, points: &[P]) -> Result<Triangulation<'_, P>, TriangulationError> {
        let point = |index: usize| {
            points
                .get(index)
                .ok_or_else(|| TriangulationError::Bookkeeping {
                    message: format!("vertex refers to missing input point {index}"),
                })
        };
        let edges = self
            .edges
            .iter()
            .map(|&(a, b)| Ok((point(a)?, point(b)?)))
            .collect::<Result<Vec<_>, TriangulationError>>()?;
        let triangles = self
            .triangles
            .iter()
            .map(|&[a, b, c]| Ok([point(a)?, point(b)?, point(c)?]))
            .collect::<Result<Vec<_>, TriangulationError>>()?;
        Ok(Triangulation {
            edges,
            triangles,
            statistics: self.statistics,
        })
    }
}

fn check_point_count(count: usize) -> Result<(), TriangulationError> {
    if count < MIN_TRIANGULATION_POINTS {
        return Err(TriangulationError::InsufficientPoints {
            actual: count,
            required: MIN_TRIANGULATION_POINTS,
        });
    }
    Ok(())
}

fn triangulate_positions<K, const D: usize>(
    kernel: K,
    positions: &[[f64; D]],
    options: SolverOptions,
) -> Result<IndexedTriangulation, TriangulationError>
where
    K: SurfaceKernel<D>,
{
    let spiral = SpiralOrdering::new(&kernel, positions);
    let scaffold = kernel.scaffold(positions, spiral.centroid(), spiral.max_radial());
    let mut algorithm = BowyerWatson::new(kernel, &scaffold, options.leaf_size)?;

    for &index in spiral.order() {
        let position = positions
            .get(index)
            .ok_or_else(|| TriangulationError::Bookkeeping {
                message: format!("spiral order refers to missing point {index}"),
            })?;
        algorithm.insert(*position, index)?;
    }

    let result = IndexedTriangulation {
        edges: algorithm.real_edges(),
        triangles: algorithm.real_triangles(),
        statistics: algorithm.statistics(),
    };
    tracing::debug!(
        kernel = K::NAME,
        points = positions.len(),
        inserted = result.statistics.points_inserted,
        skipped = result.statistics.points_skipped,
        edges = result.edges.len(),
        triangles = result.triangles.len(),
        max_cavity = result.statistics.max_cavity_size,
        "triangulation complete"
    );
    Ok(result)
}

// =============================================================================
// PLANAR SOLVER
// =============================================================================

/// Delaunay triangulation of points in the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlanarDelaunay {
    options: SolverOptions,
}

impl PlanarDelaunay {
    /// Solver with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver with the given options.
    #[must_use]
    pub const fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    #[must_use]
    pub const fn options(&self) -> SolverOptions {
        self.options
    }

    /// Triangulates `points` and returns the undirected edges between them.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InsufficientPoints`] for fewer than three
    /// points, [`TriangulationError::NonFinitePoint`] for NaN or infinite
    /// coordinates, and [`TriangulationError::Index`] if exactly collinear
    /// points produce a degenerate triangle.
    pub fn solve<'a, P: PlanarPoint>(
        &self,
        points: &'a [P],
    ) -> Result<Vec<(&'a P, &'a P)>, TriangulationError> {
        Ok(self.triangulate(points)?.edges)
    }

    /// Triangulates `points`, returning edges, triangles and statistics.
    ///
    /// # Errors
    ///
    /// Same as [`solve`](Self::solve).
    pub fn triangulate<'a, P: PlanarPoint>(
        &self,
        points: &'a [P],
    ) -> Result<Triangulation<'a, P>, TriangulationError> {
        check_point_count(points.len())?;
        let positions = points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let coords = p.coords();
                if coords.iter().all(|c| c.is_finite()) {
                    Ok(coords)
                } else {
                    Err(TriangulationError::NonFinitePoint { index })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        triangulate_positions(PlanarKernel, &positions, self.options)?.resolve(points)
    }
}

// =============================================================================
// SPHERICAL SOLVER
// =============================================================================

/// Delaunay triangulation of latitude/longitude points on the unit sphere.
///
/// Points are embedded as unit vectors; circum-shapes are spherical caps.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::delaunay_triangulation::SphericalDelaunay;
/// use orthtree_delaunay::geometry::point::LatLon;
///
/// let points = [
///     LatLon::new(0.0, 0.0),
///     LatLon::new(0.0, 90.0),
///     LatLon::new(90.0, 0.0),
/// ];
/// let result = SphericalDelaunay::new().triangulate(&points).unwrap();
/// assert_eq!(result.edges.len(), 3);
/// assert_eq!(result.triangles.len(), 1);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SphericalDelaunay {
    options: SolverOptions,
}

impl SphericalDelaunay {
    /// Solver with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver with the given options.
    #[must_use]
    pub const fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    #[must_use]
    pub const fn options(&self) -> SolverOptions {
        self.options
    }

    /// Triangulates `points` and returns the undirected edges between them.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InsufficientPoints`] for fewer than three
    /// points, [`TriangulationError::NonFinitePoint`] or
    /// [`TriangulationError::InvalidLatitude`] for bad coordinates, and
    /// [`TriangulationError::Index`] if a degenerate triangle arises.
    pub fn solve<'a, P: GeoPoint>(
        &self,
        points: &'a [P],
    ) -> Result<Vec<(&'a P, &'a P)>, TriangulationError> {
        Ok(self.triangulate(points)?.edges)
    }

    /// Triangulates `points`, returning edges, triangles and statistics.
    ///
    /// # Errors
    ///
    /// Same as [`solve`](Self::solve).
    pub fn triangulate<'a, P: GeoPoint>(
        &self,
        points: &'a [P],
    ) -> Result<Triangulation<'a, P>, TriangulationError> {
        check_point_count(points.len())?;
        let positions = points
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let latitude = p.latitude_degrees();
                let longitude = p.longitude_degrees();
                if !latitude.is_finite() || !longitude.is_finite() {
                    return Err(TriangulationError::NonFinitePoint { index });
                }
                if !(-90.0..=90.0).contains(&latitude) {
                    return Err(TriangulationError::InvalidLatitude { index, latitude });
                }
                Ok(lat_lon_to_unit_vector(latitude, longitude))
            })
            .collect::<Result<Vec<_>, _>>()?;

        triangulate_positions(SphericalKernel, &positions, self.options)?.resolve(points)
    }
}
