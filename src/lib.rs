//! # orthtree_delaunay
//!
//! An adaptive `2^D`-ary spatial index (binary tree, quadtree, octree and up)
//! and an incremental Delaunay triangulation built on top of it, for points in
//! the plane and on the sphere.
//!
//! # Features
//!
//! - Spatial index over `[f64; D]` positions for any `1 ≤ D ≤ 16`, storing
//!   opaque items by identity
//! - Grouping of items at identical positions, so duplicates never force
//!   endless subdivision
//! - Root growth on demand and leaf collapse on removal
//! - Nearest-member, sphere and box queries, with branch-and-bound pruning
//! - Optional item-to-position side map for fast `remove` and `contains`
//! - Planar and spherical Delaunay triangulation sharing one incremental
//!   Bowyer-Watson engine
//!
//! # Spatial index
//!
//! ```rust
//! use orthtree_delaunay::prelude::*;
//!
//! let config = SpatialIndexConfigBuilder::default()
//!     .lower_bounds([0.0, 0.0])
//!     .upper_bounds([100.0, 100.0])
//!     .fast_removals(true)
//!     .build()
//!     .unwrap();
//! let mut index = SpatialIndex::new(config).unwrap();
//!
//! for (i, x) in [5.0, 20.0, 35.0, 50.0].into_iter().enumerate() {
//!     index.insert([x, x], i).unwrap();
//! }
//!
//! // Members strictly closer than 16 to (25, 25).
//! let mut near = index.members_in_sphere(16.0, [25.0, 25.0]).unwrap();
//! near.sort();
//! assert_eq!(near, vec![&1, &2]);
//!
//! // Inserting outside the bounds grows the root.
//! index.insert([250.0, -40.0], 99).unwrap();
//! assert_eq!(index.nearest_member([300.0, 0.0]).unwrap(), Some(&99));
//! assert!(index.remove(&99).unwrap());
//! index.is_valid().unwrap();
//! ```
//!
//! # Triangulation
//!
//! ```rust
//! use orthtree_delaunay::prelude::*;
//!
//! let points = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0], [4.0, 6.0]];
//! let triangulation = PlanarDelaunay::new().triangulate(&points).unwrap();
//! assert_eq!(triangulation.triangles.len(), 4);
//!
//! let cities = [
//!     LatLon::new(51.5074, -0.1278),
//!     LatLon::new(48.8566, 2.3522),
//!     LatLon::new(52.5200, 13.4050),
//!     LatLon::new(41.9028, 12.4964),
//! ];
//! let edges = SphericalDelaunay::new().solve(&cities).unwrap();
//! assert_eq!(edges.len(), 5);
//! ```
//!
//! Output edges and triangles borrow the caller's points. The synthetic
//! scaffold that encloses the input while it is triangulated never appears in
//! the output.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the spatial index, the triangulation engine and
/// the bookkeeping records both are built from.
pub mod core {
    /// Triangulation algorithms
    pub mod algorithms {
        /// Incremental cavity-based insertion
        pub mod bowyer_watson;
    }
    /// High-performance collection types used by the index and the triangulation
    pub mod collections;
    pub mod delaunay_triangulation;
    pub mod edge;
    pub mod group;
    pub mod node;
    pub mod operations;
    pub mod spatial_index;
    pub mod triangle;
    pub mod util;
    pub mod vertex;
    // Re-export the `core` modules.
    pub use delaunay_triangulation::*;
    pub use spatial_index::*;
    pub use util::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Geometric types: query shapes, surface kernels, input point traits and
/// numeric helpers.
pub mod geometry {
    /// Surface kernels for the plane and the sphere
    pub mod kernel;
    pub mod point;
    /// Query shapes and node volumes
    pub mod shape;
    /// Geometric utility functions
    pub mod util;
    pub use point::*;
    pub use shape::*;
    pub use util::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        delaunay_triangulation::*,
        group::{Group, GroupKey, Member},
        node::{Node, NodeContents, NodeKey},
        operations::*,
        spatial_index::*,
        util::*,
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{kernel::*, point::*, shape::*, util::*};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
