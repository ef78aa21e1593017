//! Tree nodes of the spatial index.
//!
//! A node is either a leaf holding position groups or a branch holding `2^D`
//! optional child slots. Nodes live in a slotmap arena and refer to each other
//! through [`NodeKey`]s; the parent link is a plain key, so there are no
//! ownership cycles between parents and children.

use slotmap::new_key_type;

use crate::core::collections::{ChildSlots, SmallBuffer};
use crate::core::group::GroupKey;
use crate::geometry::shape::BoundingRegion;

new_key_type! {
    /// Key type for accessing nodes in the spatial index arena.
    pub struct NodeKey;
}

/// Contents of a node: exactly one of leaf groups or branch child slots.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeContents {
    /// Leaf node holding the keys of the groups stored in its volume.
    Leaf(Vec<GroupKey>),
    /// Branch node; slot `i` holds the child for orthant `i`, if materialized.
    Branch(ChildSlots),
}

/// A node of the spatial index.
#[derive(Clone, Debug)]
pub struct Node<const D: usize> {
    pub(crate) parent: Option<NodeKey>,
    pub(crate) region: BoundingRegion<D>,
    pub(crate) contents: NodeContents,
    pub(crate) group_count: usize,
    pub(crate) max_member_radius: f64,
}

impl<const D: usize> Node<D> {
    /// Creates an empty leaf.
    #[must_use]
    pub(crate) const fn leaf(parent: Option<NodeKey>, region: BoundingRegion<D>) -> Self {
        Self {
            parent,
            region,
            contents: NodeContents::Leaf(Vec::new()),
            group_count: 0,
            max_member_radius: 0.0,
        }
    }

    /// Creates a branch with all `2^D` child slots empty.
    #[must_use]
    pub(crate) fn branch(parent: Option<NodeKey>, region: BoundingRegion<D>) -> Self {
        Self {
            parent,
            region,
            contents: NodeContents::Branch(SmallBuffer::from_elem(None, 1 << D)),
            group_count: 0,
            max_member_radius: 0.0,
        }
    }

    /// Parent node, or `None` for the root.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Volume covered by this node.
    #[must_use]
    pub const fn region(&self) -> &BoundingRegion<D> {
        &self.region
    }

    /// Leaf groups or branch children.
    #[must_use]
    pub const fn contents(&self) -> &NodeContents {
        &self.contents
    }

    /// Number of groups stored anywhere below this node.
    #[must_use]
    pub const fn group_count(&self) -> usize {
        self.group_count
    }

    /// Upper bound of the member radii stored below this node.
    #[must_use]
    pub const fn max_member_radius(&self) -> f64 {
        self.max_member_radius
    }

    /// Returns `true` for leaf nodes.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.contents, NodeContents::Leaf(_))
    }

    /// Group keys of a leaf, or `None` for a branch.
    #[must_use]
    pub fn groups(&self) -> Option<&[GroupKey]> {
        match &self.contents {
            NodeContents::Leaf(groups) => Some(groups),
            NodeContents::Branch(_) => None,
        }
    }

    /// Materialized children of a branch; empty for a leaf.
    pub fn children(&self) -> impl Iterator<Item = NodeKey> + '_ {
        let slots: &[Option<NodeKey>] = match &self.contents {
            NodeContents::Leaf(_) => &[],
            NodeContents::Branch(slots) => slots,
        };
        slots.iter().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_and_branch_construction() {
        let region = BoundingRegion::from_bounds([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let leaf = Node::leaf(None, region.clone());
        assert!(leaf.is_leaf());
        assert_eq!(leaf.groups(), Some(&[][..]));
        assert_eq!(leaf.children().count(), 0);

        let branch = Node::branch(None, region);
        assert!(!branch.is_leaf());
        assert!(branch.groups().is_none());
        match branch.contents() {
            NodeContents::Branch(slots) => {
                assert_eq!(slots.len(), 8);
                assert!(slots.iter().all(Option::is_none));
            }
            NodeContents::Leaf(_) => panic!("expected branch"),
        }
    }
}
