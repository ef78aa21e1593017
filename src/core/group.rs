//! Position groups: all items stored at one exact position.
//!
//! Grouping identical positions keeps duplicate coordinates from forcing
//! endless subdivision; a leaf counts groups, not items, against its capacity.

use slotmap::new_key_type;

use crate::core::collections::SmallBuffer;
use crate::core::node::NodeKey;

new_key_type! {
    /// Key type for accessing position groups in the spatial index arena.
    pub struct GroupKey;
}

/// An item stored in a group, together with its member radius.
#[derive(Clone, Debug, PartialEq)]
pub struct Member<T> {
    /// The stored item.
    pub item: T,
    /// Non-negative reach of the item around its position.
    pub radius: f64,
}

/// Items sharing one bit-identical position.
#[derive(Clone, Debug)]
pub struct Group<T, const D: usize> {
    pub(crate) node: NodeKey,
    position: [f64; D],
    members: SmallBuffer<Member<T>, 2>,
    max_radius: f64,
}

impl<T: PartialEq, const D: usize> Group<T, D> {
    /// Creates a group holding a single item.
    pub(crate) fn new(node: NodeKey, position: [f64; D], item: T, radius: f64) -> Self {
        let mut members = SmallBuffer::new();
        members.push(Member { item, radius });
        Self {
            node,
            position,
            members,
            max_radius: radius,
        }
    }

    /// Leaf node currently holding this group.
    #[must_use]
    pub const fn node(&self) -> NodeKey {
        self.node
    }

    /// The shared position.
    #[must_use]
    pub const fn position(&self) -> &[f64; D] {
        &self.position
    }

    /// Items stored at this position.
    #[must_use]
    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the group holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Largest member radius.
    #[must_use]
    pub const fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Returns `true` if `item` is stored here.
    #[must_use]
    pub fn contains_item(&self, item: &T) -> bool {
        self.members.iter().any(|m| &m.item == item)
    }

    /// Adds `item`; returns `false` and keeps the original radius if it is
    /// already present.
    pub(crate) fn push(&mut self, item: T, radius: f64) -> bool {
        if self.contains_item(&item) {
            return false;
        }
        self.max_radius = self.max_radius.max(radius);
        self.members.push(Member { item, radius });
        true
    }

    /// Removes `item`, returning its radius if it was present.
    pub(crate) fn remove(&mut self, item: &T) -> Option<f64> {
        let index = self.members.iter().position(|m| &m.item == item)?;
        let removed = self.members.swap_remove(index);
        if removed.radius >= self.max_radius {
            self.max_radius = self.members.iter().fold(0.0, |acc, m| acc.max(m.radius));
        }
        Some(removed.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership_and_radius_tracking() {
        let mut group = Group::new(NodeKey::default(), [1.0, 2.0], "a", 0.5);
        assert!(group.push("b", 2.0));
        assert!(!group.push("b", 9.0));
        assert!(group.push("c", 1.0));
        assert_eq!(group.len(), 3);
        assert_eq!(group.max_radius(), 2.0);

        assert_eq!(group.remove(&"b"), Some(2.0));
        assert_eq!(group.max_radius(), 1.0);
        assert_eq!(group.remove(&"b"), None);

        assert_eq!(group.remove(&"a"), Some(0.5));
        assert_eq!(group.remove(&"c"), Some(1.0));
        assert!(group.is_empty());
        assert_eq!(group.max_radius(), 0.0);
    }
}
