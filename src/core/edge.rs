//! Canonical edge identifiers.
//!
//! The triangulation tracks, for every undirected edge, the live triangles
//! that own it. [`EdgeKey`] is the map key: both orientations of an edge map to
//! the same value.
//!
//! `EdgeKey` ordering follows internal slotmap key order and carries no
//! geometric meaning.

use crate::core::vertex::VertexKey;
use slotmap::Key;

/// Canonical identifier for an undirected edge.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::edge::EdgeKey;
/// use orthtree_delaunay::core::vertex::VertexKey;
/// use slotmap::KeyData;
///
/// let a = VertexKey::from(KeyData::from_ffi(1));
/// let b = VertexKey::from(KeyData::from_ffi(2));
/// assert_eq!(EdgeKey::new(a, b), EdgeKey::new(b, a));
/// assert_eq!(EdgeKey::new(b, a).endpoints(), (a, b));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    v0: VertexKey,
    v1: VertexKey,
}

impl EdgeKey {
    /// Creates a new canonical edge key.
    ///
    /// The endpoints are reordered so that `v0 <= v1` under the raw key order.
    #[must_use]
    pub fn new(a: VertexKey, b: VertexKey) -> Self {
        if a.data().as_ffi() <= b.data().as_ffi() {
            Self { v0: a, v1: b }
        } else {
            Self { v0: b, v1: a }
        }
    }

    /// Returns the first (canonical) endpoint.
    #[inline]
    #[must_use]
    pub const fn v0(self) -> VertexKey {
        self.v0
    }

    /// Returns the second (canonical) endpoint.
    #[inline]
    #[must_use]
    pub const fn v1(self) -> VertexKey {
        self.v1
    }

    /// Returns both endpoints in canonical order.
    #[inline]
    #[must_use]
    pub const fn endpoints(self) -> (VertexKey, VertexKey) {
        (self.v0, self.v1)
    }

    /// Returns `true` if `v` is an endpoint.
    #[inline]
    #[must_use]
    pub fn contains(self, v: VertexKey) -> bool {
        self.v0 == v || self.v1 == v
    }
}

impl From<(VertexKey, VertexKey)> for EdgeKey {
    fn from((a, b): (VertexKey, VertexKey)) -> Self {
        Self::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn test_edge_key_is_canonical() {
        let a = VertexKey::from(KeyData::from_ffi(5));
        let b = VertexKey::from(KeyData::from_ffi(3));
        let e1 = EdgeKey::new(a, b);
        let e2: EdgeKey = (b, a).into();
        assert_eq!(e1, e2);
        assert_eq!(e1.v0(), b);
        assert_eq!(e1.v1(), a);
        assert!(e1.contains(a));
        assert!(!e1.contains(VertexKey::from(KeyData::from_ffi(9))));
    }
}
