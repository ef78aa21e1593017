//! Triangulation vertices.
//!
//! A vertex is either one of the caller's input points (remembering its index
//! in the input slice) or a synthetic scaffold vertex that only exists to
//! enclose the input while the triangulation is built.

use slotmap::new_key_type;

new_key_type! {
    /// Key type for accessing vertices in the triangulation's vertex storage.
    pub struct VertexKey;
}

/// A vertex embedded in `D`-dimensional space.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::vertex::Vertex;
///
/// let input = Vertex::from_input([1.0, 2.0], 7);
/// assert_eq!(input.source(), Some(7));
/// assert!(!input.is_scaffold());
///
/// let scaffold = Vertex::scaffold([-1.0, -1.0]);
/// assert!(scaffold.is_scaffold());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex<const D: usize> {
    position: [f64; D],
    source: Option<usize>,
}

impl<const D: usize> Vertex<D> {
    /// Vertex for the input point at `index`.
    #[must_use]
    pub const fn from_input(position: [f64; D], index: usize) -> Self {
        Self {
            position,
            source: Some(index),
        }
    }

    /// Synthetic scaffold vertex.
    #[must_use]
    pub const fn scaffold(position: [f64; D]) -> Self {
        Self {
            position,
            source: None,
        }
    }

    /// Embedded position.
    #[must_use]
    pub const fn position(&self) -> &[f64; D] {
        &self.position
    }

    /// Index of the originating input point; `None` for scaffold vertices.
    #[must_use]
    pub const fn source(&self) -> Option<usize> {
        self.source
    }

    /// Returns `true` for scaffold vertices.
    #[must_use]
    pub const fn is_scaffold(&self) -> bool {
        self.source.is_none()
    }
}
