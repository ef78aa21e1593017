use super::{FastBuildHasher, FastHashMap, FastHashSet};

/// Creates a `FastHashMap` with pre-allocated capacity using the optimal hasher.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::fast_hash_map_with_capacity;
///
/// let map = fast_hash_map_with_capacity::<u64, usize>(1000);
/// assert!(map.capacity() >= 1000);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a `FastHashSet` with pre-allocated capacity using the optimal hasher.
///
/// # Examples
///
/// ```rust
/// use orthtree_delaunay::core::collections::fast_hash_set_with_capacity;
///
/// let set = fast_hash_set_with_capacity::<u32>(500);
/// assert!(set.capacity() >= 500);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_helpers() {
        let mut map = fast_hash_map_with_capacity::<u64, usize>(100);
        assert!(map.capacity() >= 100);
        map.insert(1, 2);
        assert_eq!(map.len(), 1);

        let set = fast_hash_set_with_capacity::<u64>(50);
        assert!(set.capacity() >= 50);
        assert!(set.is_empty());
    }
}
