//! Live triangles of an incremental triangulation.

use slotmap::new_key_type;

use crate::core::vertex::VertexKey;
use crate::geometry::util::Circumcircle;

new_key_type! {
    /// Key type for accessing triangles in the triangulation's storage.
    ///
    /// Triangle keys double as the items stored in the circum-shape index.
    pub struct TriangleKey;
}

/// Triangle with its cached circum-shape.
///
/// Vertex order is the triangle's winding; it is preserved when the triangle
/// is replaced, so directed edges keep a consistent orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle<const D: usize> {
    vertices: [VertexKey; 3],
    circumcircle: Circumcircle<D>,
}

impl<const D: usize> Triangle<D> {
    /// Creates a triangle from wound vertices and their circum-shape.
    #[must_use]
    pub const fn new(vertices: [VertexKey; 3], circumcircle: Circumcircle<D>) -> Self {
        Self {
            vertices,
            circumcircle,
        }
    }

    /// Vertex keys in winding order.
    #[must_use]
    pub const fn vertices(&self) -> &[VertexKey; 3] {
        &self.vertices
    }

    /// Cached circum-shape.
    #[must_use]
    pub const fn circumcircle(&self) -> &Circumcircle<D> {
        &self.circumcircle
    }

    /// Directed edges `(v0, v1)`, `(v1, v2)`, `(v2, v0)` in winding order.
    #[must_use]
    pub const fn directed_edges(&self) -> [(VertexKey, VertexKey); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_directed_edges_follow_winding() {
        let mut keys: SlotMap<VertexKey, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());
        let c = keys.insert(());
        let triangle = Triangle::new(
            [a, b, c],
            Circumcircle {
                center: [0.0, 0.0],
                radius: 1.0,
            },
        );
        assert_eq!(triangle.directed_edges(), [(a, b), (b, c), (c, a)]);
        assert_eq!(triangle.vertices(), &[a, b, c]);
    }
}
