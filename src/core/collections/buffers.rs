use crate::core::group::GroupKey;
use crate::core::node::NodeKey;
use crate::core::triangle::TriangleKey;
use crate::core::vertex::VertexKey;

use super::{INLINE_CHILD_SLOTS, SmallBuffer};

// =============================================================================
// SPATIAL INDEX BUFFER TYPES
// =============================================================================

/// Child slots of an internal node, indexed by the orthant bit pattern.
///
/// An empty slot is `None`; a node is only materialized for an orthant that
/// holds at least one group.
pub type ChildSlots = SmallBuffer<Option<NodeKey>, INLINE_CHILD_SLOTS>;

/// Groups an item has been inserted into (one per distinct position).
///
/// Most items live at exactly one position, so the inline capacity is small.
pub type GroupKeyBuffer = SmallBuffer<GroupKey, 2>;

/// Work list of nodes during split and collapse passes.
pub type NodeWorkBuffer = SmallBuffer<NodeKey, INLINE_CHILD_SLOTS>;

// =============================================================================
// TRIANGULATION BUFFER TYPES
// =============================================================================

/// Size constant for cavity bookkeeping during a single insertion.
///
/// In well-conditioned input the conflict region of one point holds a
/// handful of triangles; 16 leaves generous headroom before spilling.
pub const CAVITY_BUFFER_SIZE: usize = 16;

/// Triangles whose circum-shape contains the point being inserted.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::ConflictBuffer;
///
/// let conflicts: ConflictBuffer = ConflictBuffer::new();
/// assert!(conflicts.is_empty());
/// ```
pub type ConflictBuffer = SmallBuffer<TriangleKey, CAVITY_BUFFER_SIZE>;

/// Directed boundary edges `(a, b)` of a cavity, in the winding of the
/// removed triangle that owned them.
pub type CavityBoundaryBuffer = SmallBuffer<(VertexKey, VertexKey), CAVITY_BUFFER_SIZE>;

/// Triangles owning an edge: one on the scaffold hull, two in the interior.
pub type EdgeOwners = SmallBuffer<TriangleKey, 2>;
