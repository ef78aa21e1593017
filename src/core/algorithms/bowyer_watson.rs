//! Incremental Bowyer-Watson insertion over a surface kernel.
//!
//! The triangulation starts from a scaffold that encloses every input point
//! and inserts the points one at a time:
//!
//! 1. **Conflict search**: the circum-shape of every live triangle is stored in
//!    a [`SpatialIndex`] at its center with the circumradius as member radius,
//!    so a radius-0 sphere query at the new point returns exactly the triangles
//!    whose circum-shape strictly contains it.
//! 2. **Cavity boundary**: an edge of a conflicting triangle with fewer than two
//!    conflicting owners lies on the cavity boundary.
//! 3. **Carving**: the conflicting triangles are removed from the edge map and
//!    from the index.
//! 4. **Re-triangulation**: every boundary edge `(a, b)`, taken in the winding
//!    of its removed owner, is joined to the new vertex as triangle `(a, b, v)`.
//!
//! The same engine serves the plane and the sphere; only circum-shapes and the
//! scaffold come from the [`SurfaceKernel`].
//!
//! # References
//!
//! - **Bowyer, A.** "Computing Dirichlet tessellations." *The Computer Journal* 24.2 (1981): 162-166.
//!   DOI: [10.1093/comjnl/24.2.162](https://doi.org/10.1093/comjnl/24.2.162)
//!
//! - **Watson, D.F.** "Computing the n-dimensional Delaunay tessellation with application to
//!   Voronoi polytopes." *The Computer Journal* 24.2 (1981): 167-172.
//!   DOI: [10.1093/comjnl/24.2.167](https://doi.org/10.1093/comjnl/24.2.167)

use crate::core::{
    collections::{
        CavityBoundaryBuffer, ConflictBuffer, EdgeOwners, FastHashMap, FastHashSet, StorageMap,
    },
    delaunay_triangulation::TriangulationError,
    edge::EdgeKey,
    operations::{InsertionOutcome, InsertionStatistics},
    spatial_index::{SpatialIndex, SpatialIndexConfigBuilder},
    triangle::{Triangle, TriangleKey},
    vertex::{Vertex, VertexKey},
};
use crate::geometry::kernel::{Scaffold, SurfaceKernel};

/// Incremental Delaunay triangulation state for one solve.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::algorithms::bowyer_watson::BowyerWatson;
/// use orthtree_delaunay::geometry::kernel::{PlanarKernel, SurfaceKernel};
///
/// let points = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
/// let kernel = PlanarKernel;
/// let centroid = kernel.centroid(&points);
/// let scaffold = kernel.scaffold(&points, &centroid, 10.0);
///
/// let mut algorithm = BowyerWatson::new(kernel, &scaffold, 15).unwrap();
/// for (index, point) in points.iter().enumerate() {
///     algorithm.insert(*point, index).unwrap();
/// }
/// assert_eq!(algorithm.real_edges(), vec![(0, 1), (0, 2), (1, 2)]);
/// assert_eq!(algorithm.real_triangles().len(), 1);
/// ```
#[derive(Debug)]
pub struct BowyerWatson<K, const D: usize> {
    kernel: K,
    vertices: StorageMap<VertexKey, Vertex<D>>,
    triangles: StorageMap<TriangleKey, Triangle<D>>,
    edges: FastHashMap<EdgeKey, EdgeOwners>,
    circumcircles: SpatialIndex<TriangleKey, D>,
    occupied: FastHashSet<[u64; D]>,
    statistics: InsertionStatistics,
}

impl<K, const D: usize> BowyerWatson<K, D>
where
    K: SurfaceKernel<D>,
{
    /// Seeds the triangulation with the scaffold's vertices and triangles.
    ///
    /// `leaf_size` configures the circum-shape index.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::Configuration`] for an invalid leaf size
    /// and [`TriangulationError::Index`] if a scaffold triangle is degenerate.
    pub fn new(kernel: K, scaffold: &Scaffold<D>, leaf_size: usize) -> Result<Self, TriangulationError> {
        let (lower, upper) = kernel.index_bounds(scaffold);
        let config = SpatialIndexConfigBuilder::default()
            .lower_bounds(lower)
            .upper_bounds(upper)
            .leaf_size(leaf_size)
            .fast_removals(true)
            .build()?;

        let mut algorithm = Self {
            kernel,
            vertices: StorageMap::with_key(),
            triangles: StorageMap::with_key(),
            edges: FastHashMap::default(),
            circumcircles: SpatialIndex::new(config)?,
            occupied: FastHashSet::default(),
            statistics: InsertionStatistics::default(),
        };

        let keys: Vec<VertexKey> = scaffold
            .vertices
            .iter()
            .map(|&position| algorithm.vertices.insert(Vertex::scaffold(position)))
            .collect();
        for corners in &scaffold.triangles {
            let mut vertices = [VertexKey::default(); 3];
            for (slot, &corner) in vertices.iter_mut().zip(corners) {
                *slot = *keys.get(corner).ok_or_else(|| TriangulationError::Bookkeeping {
                    message: format!("scaffold triangle refers to missing corner {corner}"),
                })?;
            }
            algorithm.add_triangle(vertices)?;
            algorithm.statistics.triangles_created += 1;
        }

        tracing::trace!(
            kernel = K::NAME,
            vertices = keys.len(),
            triangles = algorithm.triangles.len(),
            "seeded scaffold"
        );
        Ok(algorithm)
    }

    /// Inserts the input point with index `source` at `position`.
    ///
    /// A point bit-identical to an inserted one, or one that no circum-shape
    /// strictly contains, is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::Index`] if a new triangle is degenerate
    /// and [`TriangulationError::Bookkeeping`] if the edge map is inconsistent.
    pub fn insert(
        &mut self,
        position: [f64; D],
        source: usize,
    ) -> Result<InsertionOutcome, TriangulationError> {
        if !self.occupied.insert(position.map(f64::to_bits)) {
            tracing::debug!(source, "skipping point at an occupied position");
            self.statistics.record(InsertionOutcome::SkippedDuplicate);
            return Ok(InsertionOutcome::SkippedDuplicate);
        }

        let conflicts: ConflictBuffer = self
            .circumcircles
            .members_in_sphere(0.0, position)?
            .into_iter()
            .copied()
            .collect();
        if conflicts.is_empty() {
            tracing::debug!(source, "skipping point outside every circum-shape");
            self.statistics.record(InsertionOutcome::SkippedDuplicate);
            return Ok(InsertionOutcome::SkippedDuplicate);
        }

        let boundary = self.cavity_boundary(&conflicts)?;
        for &key in &conflicts {
            self.remove_triangle(key)?;
        }

        let vertex = self.vertices.insert(Vertex::from_input(position, source));
        for &(a, b) in &boundary {
            self.add_triangle([a, b, vertex])?;
        }

        let outcome = InsertionOutcome::Inserted {
            triangles_removed: conflicts.len(),
            triangles_created: boundary.len(),
        };
        self.statistics.record(outcome);
        Ok(outcome)
    }

    /// Directed boundary edges of the cavity formed by `conflicts`.
    fn cavity_boundary(
        &self,
        conflicts: &ConflictBuffer,
    ) -> Result<CavityBoundaryBuffer, TriangulationError> {
        let marked: FastHashSet<TriangleKey> = conflicts.iter().copied().collect();
        let mut boundary = CavityBoundaryBuffer::new();
        for &key in conflicts {
            for (a, b) in self.triangle(key)?.directed_edges() {
                let owners = self.edges.get(&EdgeKey::new(a, b)).ok_or_else(|| {
                    TriangulationError::Bookkeeping {
                        message: format!("edge of triangle {key:?} is not in the edge map"),
                    }
                })?;
                let marked_owners = owners.iter().filter(|t| marked.contains(t)).count();
                if marked_owners < 2 {
                    boundary.push((a, b));
                }
            }
        }
        Ok(boundary)
    }

    fn triangle(&self, key: TriangleKey) -> Result<&Triangle<D>, TriangulationError> {
        self.triangles
            .get(key)
            .ok_or_else(|| TriangulationError::Bookkeeping {
                message: format!("triangle {key:?} is not live"),
            })
    }

    fn position(&self, key: VertexKey) -> Result<&[f64; D], TriangulationError> {
        self.vertices
            .get(key)
            .map(Vertex::position)
            .ok_or_else(|| TriangulationError::Bookkeeping {
                message: format!("vertex {key:?} does not exist"),
            })
    }

    fn add_triangle(&mut self, vertices: [VertexKey; 3]) -> Result<TriangleKey, TriangulationError> {
        let [a, b, c] = vertices;
        let circumcircle = self
            .kernel
            .circumcircle(self.position(a)?, self.position(b)?, self.position(c)?);

        let center = circumcircle.center;
        let radius = circumcircle.radius;
        let key = self.triangles.insert(Triangle::new(vertices, circumcircle));
        if let Err(error) = self.circumcircles.insert_with_radius(center, key, radius) {
            self.triangles.remove(key);
            return Err(error.into());
        }

        for (a, b) in [(a, b), (b, c), (c, a)] {
            self.edges.entry(EdgeKey::new(a, b)).or_default().push(key);
        }
        Ok(key)
    }

    fn remove_triangle(&mut self, key: TriangleKey) -> Result<Triangle<D>, TriangulationError> {
        let triangle = self
            .triangles
            .remove(key)
            .ok_or_else(|| TriangulationError::Bookkeeping {
                message: format!("triangle {key:?} removed twice"),
            })?;
        self.circumcircles.remove(&key)?;

        for (a, b) in triangle.directed_edges() {
            let edge = EdgeKey::new(a, b);
            let Some(owners) = self.edges.get_mut(&edge) else {
                return Err(TriangulationError::Bookkeeping {
                    message: format!("edge {edge:?} of triangle {key:?} is not in the edge map"),
                });
            };
            owners.retain(|owner| *owner != key);
            if owners.is_empty() {
                self.edges.remove(&edge);
            }
        }
        Ok(triangle)
    }

    fn sources(&self, vertices: &[VertexKey]) -> Option<Vec<usize>> {
        vertices
            .iter()
            .map(|&v| self.vertices.get(v).and_then(Vertex::source))
            .collect()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn statistics(&self) -> InsertionStatistics {
        self.statistics
    }

    /// Number of vertices, scaffold included.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live triangles, scaffold-touching ones included.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Live edges between two input points as sorted `(i, j)` index pairs with
    /// `i < j`.
    #[must_use]
    pub fn real_edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .edges
            .keys()
            .filter_map(|edge| {
                let sources = self.sources(&[edge.v0(), edge.v1()])?;
                Some((sources[0].min(sources[1]), sources[0].max(sources[1])))
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Live triangles whose corners are all input points, as input indices in
    /// triangle winding order, sorted.
    #[must_use]
    pub fn real_triangles(&self) -> Vec<[usize; 3]> {
        let mut triangles: Vec<[usize; 3]> = self
            .triangles
            .values()
            .filter_map(|t| {
                let sources = self.sources(t.vertices())?;
                Some([sources[0], sources[1], sources[2]])
            })
            .collect();
        triangles.sort_unstable();
        triangles
    }

    /// Checks the edge map against the live triangles and the circum-shape
    /// index.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::Bookkeeping`] describing the first
    /// inconsistency found.
    pub fn is_valid(&self) -> Result<(), TriangulationError> {
        let bookkeeping = |message: String| Err(TriangulationError::Bookkeeping { message });

        if self.circumcircles.len() != self.triangles.len() {
            return bookkeeping(format!(
                "{} circum-shapes indexed for {} triangles",
                self.circumcircles.len(),
                self.triangles.len()
            ));
        }
        for (key, triangle) in &self.triangles {
            if !self.circumcircles.contains(&key) {
                return bookkeeping(format!("triangle {key:?} is missing from the index"));
            }
            for (a, b) in triangle.directed_edges() {
                let listed = self
                    .edges
                    .get(&EdgeKey::new(a, b))
                    .is_some_and(|owners| owners.contains(&key));
                if !listed {
                    return bookkeeping(format!("edge of triangle {key:?} does not list it"));
                }
            }
        }
        for (edge, owners) in &self.edges {
            if owners.is_empty() || owners.len() > 2 {
                return bookkeeping(format!("edge {edge:?} has {} owners", owners.len()));
            }
            if owners.iter().any(|t| !self.triangles.contains_key(*t)) {
                return bookkeeping(format!("edge {edge:?} lists a dead triangle"));
            }
        }
        self.circumcircles.is_valid().map_err(|error| TriangulationError::Bookkeeping {
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::kernel::{PlanarKernel, SphericalKernel};
    use crate::geometry::util::lat_lon_to_unit_vector;

    fn planar(points: &[[f64; 2]]) -> BowyerWatson<PlanarKernel, 2> {
        let kernel = PlanarKernel;
        let centroid = kernel.centroid(points);
        let max_radial = kernel
            .polar_coordinates(&centroid, points)
            .iter()
            .fold(0.0_f64, |acc, &(r, _)| acc.max(r));
        let scaffold = kernel.scaffold(points, &centroid, max_radial);
        let mut algorithm = BowyerWatson::new(kernel, &scaffold, 4).unwrap();
        for (index, point) in points.iter().enumerate() {
            algorithm.insert(*point, index).unwrap();
        }
        algorithm
    }

    #[test]
    fn test_planar_scaffold_seeding() {
        let kernel = PlanarKernel;
        let points = [[0.0, 0.0], [1.0, 1.0]];
        let scaffold = kernel.scaffold(&points, &[0.5, 0.5], 1.0);
        let algorithm = BowyerWatson::new(kernel, &scaffold, 15).unwrap();
        assert_eq!(algorithm.vertex_count(), 4);
        assert_eq!(algorithm.triangle_count(), 2);
        assert_eq!(algorithm.statistics().triangles_created, 2);
        assert!(algorithm.real_edges().is_empty());
        algorithm.is_valid().unwrap();
    }

    #[test]
    fn test_square_with_center_point() {
        let points = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [2.0, 1.0]];
        let algorithm = planar(&points);
        algorithm.is_valid().unwrap();

        let edges = algorithm.real_edges();
        for corner in 0..4 {
            assert!(edges.contains(&(corner, 4)), "missing spoke to {corner}");
        }
        let triangles = algorithm.real_triangles();
        assert_eq!(triangles.len(), 4);
        assert!(triangles.iter().all(|t| t.contains(&4)));
    }

    #[test]
    fn test_duplicate_point_is_skipped() {
        let points = [[0.0, 0.0], [5.0, 0.0], [0.0, 5.0], [5.0, 0.0]];
        let algorithm = planar(&points);
        let stats = algorithm.statistics();
        assert_eq!(stats.points_inserted, 3);
        assert_eq!(stats.points_skipped, 1);
        assert_eq!(algorithm.real_edges(), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(stats.net_triangles(), algorithm.triangle_count());
    }

    #[test]
    fn test_spherical_octant() {
        let kernel = SphericalKernel;
        let points = [
            lat_lon_to_unit_vector(0.0, 0.0),
            lat_lon_to_unit_vector(0.0, 90.0),
            lat_lon_to_unit_vector(90.0, 0.0),
        ];
        let centroid = kernel.centroid(&points);
        let max_angle = kernel
            .polar_coordinates(&centroid, &points)
            .iter()
            .fold(0.0_f64, |acc, &(r, _)| acc.max(r));
        let scaffold = kernel.scaffold(&points, &centroid, max_angle);
        let mut algorithm = BowyerWatson::new(kernel, &scaffold, 15).unwrap();
        for (index, point) in points.iter().enumerate() {
            let outcome = algorithm.insert(*point, index).unwrap();
            assert!(matches!(outcome, InsertionOutcome::Inserted { .. }));
        }
        algorithm.is_valid().unwrap();
        assert_eq!(algorithm.real_edges(), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(algorithm.real_triangles().len(), 1);
        // 1 scaffold triangle, +2 per insertion.
        assert_eq!(algorithm.triangle_count(), 7);
    }
}
