use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;
use slotmap::SlotMap;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena storage used for tree nodes, position groups, and triangulation records.
///
/// Records are addressed by typed slotmap keys, so parent/child links and
/// back-references are plain `Copy` keys rather than owning pointers. Keys of
/// removed records are never reused for a different record (slotmap versioning),
/// which turns a stale key into a failed lookup instead of silent aliasing.
///
/// # Internal Use Only
///
/// This alias should not appear in public API signatures; public methods expose
/// iterators or owned results instead.
pub type StorageMap<K, V> = SlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` type for performance-critical operations.
/// Uses `FastHasher` (`rustc_hash::FxHasher`) for faster hashing in non-cryptographic contexts.
///
/// # Security Warning
///
/// ⚠️ **Not DoS-resistant**: Do not use with attacker-controlled keys.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Fast non-cryptographic hasher alias for internal collections.
pub type FastHasher = FxHasher;

/// Build hasher that instantiates [`FastHasher`].
pub type FastBuildHasher = FxBuildHasher;

/// Re-export the Entry enum for `FastHashMap`.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::{Entry, FastHashMap};
///
/// let mut map: FastHashMap<&str, usize> = FastHashMap::default();
/// match map.entry("key") {
///     Entry::Occupied(mut e) => *e.get_mut() += 1,
///     Entry::Vacant(e) => {
///         e.insert(1);
///     }
/// }
/// assert_eq!(map["key"], 1);
/// ```
pub use std::collections::hash_map::Entry;

/// Optimized `HashSet` type for performance-critical operations.
/// Uses `FastHasher` (`rustc_hash::FxHasher`) for faster hashing in non-cryptographic contexts.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::FastHashSet;
///
/// let mut set: FastHashSet<u64> = FastHashSet::default();
/// set.insert(7);
/// assert!(set.contains(&7));
/// ```
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that uses inline storage for small collections and
/// falls back to the heap when it grows past `N` elements.
///
/// # Size Guidelines
///
/// - **N=2**: Triangles sharing an edge (1 on the hull, 2 in the interior)
/// - **N=4**: Scaffold vertices, groups sharing one item
/// - **N=16**: Child slots of a node up to four dimensions, cavity triangles
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS
// =============================================================================

/// Highest dimension a [`SpatialIndex`](crate::core::spatial_index::SpatialIndex) accepts.
///
/// Internal nodes carry `2^D` child slots, so the fan-out doubles with every
/// added axis; 16 dimensions already means 65 536 slots per branch.
pub const MAX_INDEX_DIMENSION: usize = 16;

/// Inline capacity for the child-slot buffer of an internal node.
///
/// Covers `2^D` slots without a heap allocation for `D ≤ 4`.
pub const INLINE_CHILD_SLOTS: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        assert!(map.is_empty());

        map.insert(123, 456);
        assert_eq!(map.get(&123), Some(&456));
        assert_eq!(map.len(), 1);

        let mut set: FastHashSet<u64> = FastHashSet::default();
        set.insert(789);
        set.insert(789);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&999));
    }

    #[test]
    fn test_small_buffer_spills_past_inline_capacity() {
        let mut buffer: SmallBuffer<i32, 4> = SmallBuffer::new();
        for i in 0..4 {
            buffer.push(i);
        }
        assert!(!buffer.spilled());

        buffer.push(4);
        assert_eq!(buffer.len(), 5);
        assert!(buffer.spilled());
    }

    #[test]
    fn test_inline_child_slots_cover_four_dimensions() {
        assert_eq!(1_usize << 4, INLINE_CHILD_SLOTS);
        assert!(MAX_INDEX_DIMENSION >= 4);
    }
}
