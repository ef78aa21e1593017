//! Property-based model tests for the spatial index.
//!
//! Random sequences of inserts and removals are applied both to the index and
//! to a plain set of `(position, item)` pairs. After every step the index must
//! agree with the model and pass its structural validation.

use orthtree_delaunay::core::spatial_index::{SpatialIndex, SpatialIndexConfigBuilder};
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// STRATEGIES
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    Insert([i8; 2], u8),
    Remove(u8),
}

/// Coordinates on a coarse grid that also reaches outside the initial bounds,
/// so duplicates, splits, collapses and root growth all occur.
fn grid_position() -> impl Strategy<Value = [i8; 2]> {
    prop::array::uniform2(-12_i8..=24)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (grid_position(), 0_u8..20).prop_map(|(p, item)| Op::Insert(p, item)),
        1 => (0_u8..20).prop_map(Op::Remove),
    ]
}

fn to_position(p: [i8; 2]) -> [f64; 2] {
    [f64::from(p[0]) * 0.5, f64::from(p[1]) * 0.5]
}

fn new_index(leaf_size: usize, fast_removals: bool) -> SpatialIndex<u8, 2> {
    let config = SpatialIndexConfigBuilder::default()
        .lower_bounds([0.0, 0.0])
        .upper_bounds([4.0, 4.0])
        .leaf_size(leaf_size)
        .fast_removals(fast_removals)
        .build()
        .unwrap();
    SpatialIndex::new(config).unwrap()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_index_matches_model(
        ops in prop::collection::vec(op(), 1..120),
        leaf_size in 1_usize..5,
        fast_removals in any::<bool>(),
    ) {
        let mut index = new_index(leaf_size, fast_removals);
        let mut model: BTreeSet<([i8; 2], u8)> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Insert(p, item) => {
                    let fresh = model.insert((p, item));
                    prop_assert_eq!(index.insert(to_position(p), item).unwrap(), fresh);
                }
                Op::Remove(item) => {
                    let before = model.len();
                    model.retain(|&(_, stored)| stored != item);
                    prop_assert_eq!(index.remove(&item).unwrap(), model.len() != before);
                    prop_assert!(!index.contains(&item));
                }
            }

            prop_assert!(index.is_valid().is_ok(), "{:?}", index.is_valid());
            prop_assert_eq!(index.len(), model.len());

            let expected: BTreeSet<u8> = model.iter().map(|&(_, item)| item).collect();
            let all = index.all_members();
            prop_assert_eq!(all.len(), expected.len());
            let all: BTreeSet<u8> = all.into_iter().copied().collect();
            prop_assert_eq!(&all, &expected);
            for item in 0_u8..20 {
                prop_assert_eq!(index.contains(&item), expected.contains(&item));
            }

            let positions: BTreeSet<[i8; 2]> = model.iter().map(|&(p, _)| p).collect();
            prop_assert_eq!(index.group_count(), positions.len());
        }
    }

    #[test]
    fn prop_sphere_query_matches_scan(
        points in prop::collection::vec(grid_position(), 0..80),
        center in grid_position(),
        radius in 0.0_f64..8.0,
    ) {
        let mut index = new_index(3, false);
        for (i, p) in points.iter().enumerate() {
            index.insert(to_position(*p), u8::try_from(i).unwrap()).unwrap();
        }
        let c = to_position(center);
        let mut found: Vec<u8> = index.members_in_sphere(radius, c).unwrap().into_iter().copied().collect();
        found.sort_unstable();

        let expected: Vec<u8> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                let q = to_position(**p);
                let (dx, dy) = (q[0] - c[0], q[1] - c[1]);
                dx.mul_add(dx, dy * dy) < radius * radius
            })
            .map(|(i, _)| u8::try_from(i).unwrap())
            .collect();
        prop_assert_eq!(found, expected);
    }
}
