//! Adaptive `2^D`-ary spatial index.
//!
//! [`SpatialIndex`] stores opaque items at floating-point positions in a tree
//! of nested axis-aligned boxes (a binary tree in 1D, a quadtree in 2D, an
//! octree in 3D, and so on). Items sharing one exact position are kept in a
//! single [`Group`], and a leaf splits into `2^D` orthants only when it holds
//! more than `leaf_size` groups and its box can still be subdivided.
//!
//! # Growth and shrinkage
//!
//! The root grows on demand: inserting outside the current bounds wraps the
//! root in a new root twice as wide per axis, repeated until the position is
//! covered. Removal prunes emptied nodes and collapses any branch whose group
//! count fell to `leaf_size` or below back into a leaf.
//!
//! # Member radii
//!
//! Every stored `(position, item)` pair carries a non-negative member radius.
//! Sphere queries match members whose distance to the query center is below
//! the query radius plus the member radius. Each node keeps an exact upper
//! bound of the radii below it so sphere queries can still prune subtrees.
//! Plain [`insert`](SpatialIndex::insert) uses radius 0, for which a sphere
//! query is the ordinary open-ball query.
//!
//! # Examples
//!
//! ```
//! use orthtree_delaunay::core::spatial_index::SpatialIndex;
//!
//! let mut index = SpatialIndex::with_bounds([0.0, 0.0], [100.0, 100.0]).unwrap();
//! index.insert([10.0, 10.0], "a").unwrap();
//! index.insert([12.0, 10.0], "b").unwrap();
//! index.insert([90.0, 90.0], "c").unwrap();
//!
//! let mut near = index.members_in_sphere(5.0, [11.0, 10.0]).unwrap();
//! near.sort();
//! assert_eq!(near, vec![&"a", &"b"]);
//! assert_eq!(index.nearest_member([80.0, 95.0]).unwrap(), Some(&"c"));
//!
//! assert!(index.remove(&"a").unwrap());
//! assert!(!index.contains(&"a"));
//! assert_eq!(index.len(), 2);
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::hash::Hash;

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::core::collections::{
    ChildSlots, FastHashMap, FastHashSet, GroupKeyBuffer, MAX_INDEX_DIMENSION, NodeWorkBuffer,
    StorageMap,
};
use crate::core::group::{Group, GroupKey};
use crate::core::node::{Node, NodeContents, NodeKey};
use crate::geometry::shape::{BoundingRegion, Intersection, Rectanguloid, Shape, Sphere};
use crate::geometry::util::{bitwise_eq, squared_distance};

/// Default maximum number of groups per leaf before it splits.
pub const DEFAULT_LEAF_SIZE: usize = 15;

// =============================================================================
// ERRORS
// =============================================================================

/// Invalid construction parameters.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// `leaf_size` must be at least 1.
    #[error("Invalid leaf size {leaf_size}: must be at least 1")]
    InvalidLeafSize {
        /// The rejected value.
        leaf_size: usize,
    },
    /// A lower bound exceeds the matching upper bound.
    #[error("Inverted bounds on axis {axis}: lower {lower} > upper {upper}")]
    InvertedBounds {
        /// Offending axis.
        axis: usize,
        /// Lower bound on that axis.
        lower: f64,
        /// Upper bound on that axis.
        upper: f64,
    },
    /// A bound is NaN or infinite.
    #[error("Non-finite bound {value} on axis {axis}")]
    NonFiniteBounds {
        /// Offending axis.
        axis: usize,
        /// The rejected value.
        value: f64,
    },
    /// The dimension is outside the supported range.
    #[error("Unsupported dimension {dimension}: must be between 1 and {max}")]
    UnsupportedDimension {
        /// Requested dimension.
        dimension: usize,
        /// Highest supported dimension.
        max: usize,
    },
    /// A required builder field was not set.
    #[error("Missing configuration field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },
}

impl From<derive_builder::UninitializedFieldError> for ConfigurationError {
    fn from(error: derive_builder::UninitializedFieldError) -> Self {
        Self::MissingField {
            field: error.field_name().to_string(),
        }
    }
}

/// Invalid query or mutation argument. Rejected before any state changes.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ArgumentError {
    /// A coordinate is not usable (NaN, or infinite where a finite value is required).
    #[error("Invalid coordinate {value} on axis {axis}")]
    InvalidCoordinate {
        /// Offending axis.
        axis: usize,
        /// The rejected value.
        value: f64,
    },
    /// A radius is negative, NaN or infinite.
    #[error("Invalid radius {radius}: must be finite and non-negative")]
    InvalidRadius {
        /// The rejected value.
        radius: f64,
    },
}

/// Broken internal invariant. Indicates a bug in the index, never bad input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralInvariantError {
    /// A node key does not resolve.
    #[error("Node {node:?} is missing from the arena")]
    MissingNode {
        /// The dangling key.
        node: NodeKey,
    },
    /// A group key does not resolve.
    #[error("Group {group:?} is missing from the arena")]
    MissingGroup {
        /// The dangling key.
        group: GroupKey,
    },
    /// An aggregate group count disagrees with the node's contents.
    #[error("Node {node:?} records {recorded} groups but holds {actual}")]
    GroupCountMismatch {
        /// Offending node.
        node: NodeKey,
        /// Stored aggregate.
        recorded: usize,
        /// Recomputed value.
        actual: usize,
    },
    /// A child's parent link does not point back at its parent.
    #[error("Node {node:?} does not link back to parent {expected:?}")]
    BrokenParentLink {
        /// Offending child.
        node: NodeKey,
        /// Parent that references it.
        expected: Option<NodeKey>,
    },
    /// A group's leaf link does not point at the leaf holding it.
    #[error("Group {group:?} does not link back to leaf {node:?}")]
    BrokenGroupLink {
        /// Offending group.
        group: GroupKey,
        /// Leaf that holds it.
        node: NodeKey,
    },
    /// A stored position or child box lies outside its node's box.
    #[error("Node {node:?} holds content outside its bounds")]
    OutsideBounds {
        /// Offending node.
        node: NodeKey,
    },
    /// A cached radius bound is not the exact maximum below the node.
    #[error("Node {node:?} radius bound is stale")]
    StaleRadiusBound {
        /// Offending node.
        node: NodeKey,
    },
    /// A non-root node or a group is empty.
    #[error("Empty {what} left in the tree")]
    EmptyEntry {
        /// `"node"` or `"group"`.
        what: &'static str,
    },
    /// A reachable-entry count disagrees with the arena or length.
    #[error("{what}: expected {expected}, found {actual}")]
    CountMismatch {
        /// What was counted.
        what: &'static str,
        /// Recorded value.
        expected: usize,
        /// Recomputed value.
        actual: usize,
    },
    /// The item-to-groups side map disagrees with the tree.
    #[error("Fast-removal map is inconsistent: {message}")]
    SideMapMismatch {
        /// Description of the inconsistency.
        message: String,
    },
}

/// Error from a spatial index operation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SpatialIndexError {
    /// Rejected argument; the index is unchanged.
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    /// Internal invariant violation.
    #[error(transparent)]
    Structural(#[from] StructuralInvariantError),
}

fn validate_position<const D: usize>(position: &[f64; D]) -> Result<(), ArgumentError> {
    match position.iter().position(|x| !x.is_finite()) {
        Some(axis) => Err(ArgumentError::InvalidCoordinate {
            axis,
            value: position[axis],
        }),
        None => Ok(()),
    }
}

fn validate_radius(radius: f64) -> Result<(), ArgumentError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(ArgumentError::InvalidRadius { radius })
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Construction parameters for a [`SpatialIndex`].
///
/// # Examples
///
/// ```
/// use orthtree_delaunay::core::spatial_index::{
///     ConfigurationError, SpatialIndex, SpatialIndexConfigBuilder,
/// };
///
/// let config = SpatialIndexConfigBuilder::default()
///     .lower_bounds([0.0, 0.0, 0.0])
///     .upper_bounds([10.0, 10.0, 10.0])
///     .leaf_size(8)
///     .fast_removals(true)
///     .build()
///     .unwrap();
/// let index: SpatialIndex<u32, 3> = SpatialIndex::new(config).unwrap();
/// assert_eq!(index.leaf_size(), 8);
///
/// let inverted = SpatialIndexConfigBuilder::default()
///     .lower_bounds([1.0])
///     .upper_bounds([0.0])
///     .build();
/// assert!(matches!(inverted, Err(ConfigurationError::InvertedBounds { axis: 0, .. })));
/// ```
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(validate = "Self::validate", error = "ConfigurationError"))]
pub struct SpatialIndexConfig<const D: usize> {
    /// Lower corner of the initial root box.
    lower_bounds: [f64; D],
    /// Upper corner of the initial root box.
    upper_bounds: [f64; D],
    /// Maximum groups per leaf before splitting.
    #[builder(default = "DEFAULT_LEAF_SIZE")]
    leaf_size: usize,
    /// Maintain an item-to-groups map for fast `remove` and `contains`.
    #[builder(default)]
    fast_removals: bool,
}

fn check_configuration<const D: usize>(
    lower: Option<&[f64; D]>,
    upper: Option<&[f64; D]>,
    leaf_size: Option<usize>,
) -> Result<(), ConfigurationError> {
    if D == 0 || D > MAX_INDEX_DIMENSION {
        return Err(ConfigurationError::UnsupportedDimension {
            dimension: D,
            max: MAX_INDEX_DIMENSION,
        });
    }
    if leaf_size == Some(0) {
        return Err(ConfigurationError::InvalidLeafSize { leaf_size: 0 });
    }
    for bounds in [lower, upper].into_iter().flatten() {
        if let Some(axis) = bounds.iter().position(|x| !x.is_finite()) {
            return Err(ConfigurationError::NonFiniteBounds {
                axis,
                value: bounds[axis],
            });
        }
    }
    if let (Some(lower), Some(upper)) = (lower, upper)
        && let Some(axis) = (0..D).find(|&i| lower[i] > upper[i])
    {
        return Err(ConfigurationError::InvertedBounds {
            axis,
            lower: lower[axis],
            upper: upper[axis],
        });
    }
    Ok(())
}

impl<const D: usize> SpatialIndexConfigBuilder<D> {
    fn validate(&self) -> Result<(), ConfigurationError> {
        check_configuration(
            self.lower_bounds.as_ref(),
            self.upper_bounds.as_ref(),
            self.leaf_size,
        )
    }
}

impl<const D: usize> SpatialIndexConfig<D> {
    /// Configuration with default leaf size and removal mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for non-finite or inverted bounds, or an
    /// unsupported dimension.
    pub fn new(lower_bounds: [f64; D], upper_bounds: [f64; D]) -> Result<Self, ConfigurationError> {
        SpatialIndexConfigBuilder::default()
            .lower_bounds(lower_bounds)
            .upper_bounds(upper_bounds)
            .build()
    }

    /// Lower corner of the initial root box.
    #[must_use]
    pub const fn lower_bounds(&self) -> &[f64; D] {
        &self.lower_bounds
    }

    /// Upper corner of the initial root box.
    #[must_use]
    pub const fn upper_bounds(&self) -> &[f64; D] {
        &self.upper_bounds
    }

    /// Maximum groups per leaf before splitting.
    #[must_use]
    pub const fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Whether the item-to-groups side map is maintained.
    #[must_use]
    pub const fn fast_removals(&self) -> bool {
        self.fast_removals
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        check_configuration(
            Some(&self.lower_bounds),
            Some(&self.upper_bounds),
            Some(self.leaf_size),
        )
    }
}

// =============================================================================
// SPATIAL INDEX
// =============================================================================

/// Adaptive `2^D`-ary tree over `D`-dimensional positions.
///
/// Items are compared by `Eq`/`Hash` identity and never inspected otherwise.
/// The same item may be stored at several positions; it then appears once in
/// every query result that matches any of them.
#[derive(Clone, Debug)]
pub struct SpatialIndex<T, const D: usize> {
    nodes: StorageMap<NodeKey, Node<D>>,
    groups: StorageMap<GroupKey, Group<T, D>>,
    root: NodeKey,
    leaf_size: usize,
    item_groups: Option<FastHashMap<T, GroupKeyBuffer>>,
    len: usize,
}

impl<T, const D: usize> SpatialIndex<T, D>
where
    T: Clone + Eq + Hash,
{
    /// Creates an empty index.
    ///
    /// An axis with `lower == upper` is widened to unit extent so that the
    /// root can grow by doubling.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the configuration is invalid.
    pub fn new(config: SpatialIndexConfig<D>) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let mut lower = config.lower_bounds;
        let mut upper = config.upper_bounds;
        for axis in 0..D {
            if lower[axis] == upper[axis] {
                lower[axis] -= 0.5;
                upper[axis] += 0.5;
            }
        }

        let mut nodes = StorageMap::with_key();
        let root = nodes.insert(Node::leaf(None, BoundingRegion::from_bounds(lower, upper)));

        Ok(Self {
            nodes,
            groups: StorageMap::with_key(),
            root,
            leaf_size: config.leaf_size,
            item_groups: config.fast_removals.then(FastHashMap::default),
            len: 0,
        })
    }

    /// Creates an empty index with default leaf size and without the
    /// fast-removal map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for non-finite or inverted bounds.
    pub fn with_bounds(lower: [f64; D], upper: [f64; D]) -> Result<Self, ConfigurationError> {
        Self::new(SpatialIndexConfig::new(lower, upper)?)
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Number of stored `(position, item)` pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct stored positions.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of tree nodes, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Maximum groups per leaf before splitting.
    #[must_use]
    pub const fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Whether the item-to-groups side map is maintained.
    #[must_use]
    pub const fn fast_removals(&self) -> bool {
        self.item_groups.is_some()
    }

    /// Current root box as `(lower, upper)`.
    ///
    /// Starts at the configured bounds and only grows.
    #[must_use]
    pub fn bounds(&self) -> ([f64; D], [f64; D]) {
        self.nodes.get(self.root).map_or(([0.0; D], [0.0; D]), |root| {
            (*root.region.lower(), *root.region.upper())
        })
    }

    /// Iterates over every stored `(position, item)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64; D], &T)> + '_ {
        self.groups.values().flat_map(|group| {
            let position = group.position();
            group.members().iter().map(move |m| (position, &m.item))
        })
    }

    fn node(&self, key: NodeKey) -> Result<&Node<D>, StructuralInvariantError> {
        self.nodes
            .get(key)
            .ok_or(StructuralInvariantError::MissingNode { node: key })
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node<D>, StructuralInvariantError> {
        self.nodes
            .get_mut(key)
            .ok_or(StructuralInvariantError::MissingNode { node: key })
    }

    fn group(&self, key: GroupKey) -> Result<&Group<T, D>, StructuralInvariantError> {
        self.groups
            .get(key)
            .ok_or(StructuralInvariantError::MissingGroup { group: key })
    }

    fn group_mut(&mut self, key: GroupKey) -> Result<&mut Group<T, D>, StructuralInvariantError> {
        self.groups
            .get_mut(key)
            .ok_or(StructuralInvariantError::MissingGroup { group: key })
    }

    // -------------------------------------------------------------------------
    // Insertion
    // -------------------------------------------------------------------------

    /// Stores `item` at `position` with member radius 0.
    ///
    /// Returns `false` (and changes nothing) if the same item is already stored
    /// at this exact position.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::InvalidCoordinate`] for a non-finite coordinate.
    pub fn insert(&mut self, position: [f64; D], item: T) -> Result<bool, SpatialIndexError> {
        self.insert_with_radius(position, item, 0.0)
    }

    /// Stores `item` at `position` with the given member radius.
    ///
    /// The item then matches sphere queries whose ball comes within `radius`
    /// of `position`. Re-inserting an existing `(position, item)` pair is a
    /// no-op that keeps the original radius.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] for a non-finite coordinate or an invalid
    /// radius.
    pub fn insert_with_radius(
        &mut self,
        position: [f64; D],
        item: T,
        radius: f64,
    ) -> Result<bool, SpatialIndexError> {
        validate_position(&position)?;
        validate_radius(radius)?;

        self.grow_to_contain(&position)?;
        let leaf = self.descend_creating(&position)?;

        let existing = self
            .node(leaf)?
            .groups()
            .into_iter()
            .flatten()
            .copied()
            .find(|&gk| {
                self.groups
                    .get(gk)
                    .is_some_and(|g| bitwise_eq(g.position(), &position))
            });

        let group_key = if let Some(gk) = existing {
            if !self.group_mut(gk)?.push(item.clone(), radius) {
                return Ok(false);
            }
            gk
        } else {
            let gk = self
                .groups
                .insert(Group::new(leaf, position, item.clone(), radius));
            if let NodeContents::Leaf(groups) = &mut self.node_mut(leaf)?.contents {
                groups.push(gk);
            }
            let mut cursor = Some(leaf);
            while let Some(key) = cursor {
                let node = self.node_mut(key)?;
                node.group_count += 1;
                cursor = node.parent;
            }
            gk
        };

        if let Some(map) = &mut self.item_groups {
            map.entry(item).or_default().push(group_key);
        }
        self.len += 1;
        self.raise_radius_bound(leaf, radius)?;

        if existing.is_none() {
            self.split_overfull(leaf)?;
        }
        Ok(true)
    }

    /// Wraps the root in larger roots until `position` is covered.
    fn grow_to_contain(&mut self, position: &[f64; D]) -> Result<(), StructuralInvariantError> {
        loop {
            let root = self.node(self.root)?;
            if root.region.contains(position) {
                return Ok(());
            }
            let (grown, slot) = root.region.grow_towards(position);

            if root.group_count == 0 && root.is_leaf() {
                self.node_mut(self.root)?.region = grown;
                continue;
            }

            let old_root = self.root;
            let group_count = root.group_count;
            let max_member_radius = root.max_member_radius;
            tracing::trace!(
                lower = ?grown.lower(),
                upper = ?grown.upper(),
                "growing spatial index root"
            );

            let mut new_root = Node::branch(None, grown);
            if let NodeContents::Branch(children) = &mut new_root.contents {
                children[slot] = Some(old_root);
            }
            new_root.group_count = group_count;
            new_root.max_member_radius = max_member_radius;

            let new_key = self.nodes.insert(new_root);
            self.node_mut(old_root)?.parent = Some(new_key);
            self.root = new_key;
        }
    }

    /// Walks from the root to the leaf covering `position`, materializing
    /// missing children on the way.
    fn descend_creating(&mut self, position: &[f64; D]) -> Result<NodeKey, StructuralInvariantError> {
        let mut key = self.root;
        loop {
            let node = self.node(key)?;
            let NodeContents::Branch(children) = &node.contents else {
                return Ok(key);
            };
            let index = node.region.child_index(position);
            if let Some(child) = children[index] {
                key = child;
                continue;
            }

            let child_region = node.region.child(index);
            let child = self.nodes.insert(Node::leaf(Some(key), child_region));
            if let NodeContents::Branch(children) = &mut self.node_mut(key)?.contents {
                children[index] = Some(child);
            }
            return Ok(child);
        }
    }

    fn raise_radius_bound(
        &mut self,
        from: NodeKey,
        radius: f64,
    ) -> Result<(), StructuralInvariantError> {
        let mut cursor = Some(from);
        while let Some(key) = cursor {
            let node = self.node_mut(key)?;
            if node.max_member_radius >= radius {
                break;
            }
            node.max_member_radius = radius;
            cursor = node.parent;
        }
        Ok(())
    }

    /// Splits `start` and, recursively, every overfull child it produces.
    fn split_overfull(&mut self, start: NodeKey) -> Result<(), StructuralInvariantError> {
        let mut work = NodeWorkBuffer::new();
        work.push(start);

        let leaf_size = self.leaf_size;
        while let Some(key) = work.pop() {
            let node = self.node_mut(key)?;
            if node.group_count <= leaf_size || !node.region.can_subdivide() {
                continue;
            }
            let NodeContents::Leaf(groups) = &mut node.contents else {
                continue;
            };
            let groups = std::mem::take(groups);
            let region = node.region.clone();

            tracing::trace!(
                groups = groups.len(),
                center = ?region.center(),
                "splitting spatial index leaf"
            );

            let mut children = ChildSlots::from_elem(None, 1 << D);
            for gk in groups {
                let group = self.group(gk)?;
                let index = region.child_index(group.position());
                let group_radius = group.max_radius();

                let child = match children[index] {
                    Some(child) => child,
                    None => {
                        let child = self.nodes.insert(Node::leaf(Some(key), region.child(index)));
                        children[index] = Some(child);
                        child
                    }
                };
                let child_node = self.node_mut(child)?;
                if let NodeContents::Leaf(child_groups) = &mut child_node.contents {
                    child_groups.push(gk);
                }
                child_node.group_count += 1;
                child_node.max_member_radius = child_node.max_member_radius.max(group_radius);
                self.group_mut(gk)?.node = child;
            }

            for &child in children.iter().flatten() {
                if self.node(child)?.group_count > leaf_size {
                    work.push(child);
                }
            }
            self.node_mut(key)?.contents = NodeContents::Branch(children);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Removes `item` from every position it is stored at.
    ///
    /// Returns `true` if the item was found at least once.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialIndexError::Structural`] only if the tree is corrupt.
    pub fn remove(&mut self, item: &T) -> Result<bool, SpatialIndexError> {
        let group_keys: GroupKeyBuffer = match &mut self.item_groups {
            Some(map) => map.remove(item).unwrap_or_default(),
            None => self
                .groups
                .iter()
                .filter(|(_, group)| group.contains_item(item))
                .map(|(gk, _)| gk)
                .collect(),
        };
        if group_keys.is_empty() {
            return Ok(false);
        }

        for gk in group_keys {
            self.remove_from_group(gk, item)?;
        }
        Ok(true)
    }

    fn remove_from_group(&mut self, gk: GroupKey, item: &T) -> Result<(), SpatialIndexError> {
        let group = self.group_mut(gk)?;
        if group.remove(item).is_none() {
            return Err(StructuralInvariantError::SideMapMismatch {
                message: format!("group {gk:?} does not hold the item mapped to it"),
            }
            .into());
        }
        let leaf = group.node;
        let emptied = group.is_empty();
        self.len -= 1;

        if !emptied {
            self.refresh_radius_bounds(leaf)?;
            return Ok(());
        }

        self.groups.remove(gk);
        if let NodeContents::Leaf(groups) = &mut self.node_mut(leaf)?.contents
            && let Some(slot) = groups.iter().position(|&g| g == gk)
        {
            groups.swap_remove(slot);
        }

        let mut cursor = Some(leaf);
        while let Some(key) = cursor {
            let node = self.node_mut(key)?;
            node.group_count -= 1;
            cursor = node.parent;
        }

        let lowest = self.prune_empty(leaf)?;
        self.refresh_radius_bounds(lowest)?;
        self.collapse_underfull(lowest)?;
        Ok(())
    }

    /// Deletes empty non-root nodes from `start` upwards; returns the lowest
    /// surviving node.
    fn prune_empty(&mut self, start: NodeKey) -> Result<NodeKey, StructuralInvariantError> {
        let mut key = start;
        loop {
            let node = self.node(key)?;
            if node.group_count > 0 {
                return Ok(key);
            }
            let Some(parent) = node.parent else {
                // The root stays; an emptied root branch reverts to a leaf.
                let root = self.node_mut(key)?;
                if !root.is_leaf() {
                    root.contents = NodeContents::Leaf(Vec::new());
                }
                root.max_member_radius = 0.0;
                return Ok(key);
            };

            self.nodes.remove(key);
            if let NodeContents::Branch(children) = &mut self.node_mut(parent)?.contents
                && let Some(slot) = children.iter_mut().find(|slot| **slot == Some(key))
            {
                *slot = None;
            }
            key = parent;
        }
    }

    /// Collapses the topmost ancestor branch of `start` whose group count is
    /// positive but at most `leaf_size`.
    fn collapse_underfull(&mut self, start: NodeKey) -> Result<(), StructuralInvariantError> {
        let mut target = None;
        let mut cursor = Some(start);
        while let Some(key) = cursor {
            let node = self.node(key)?;
            if !node.is_leaf() && node.group_count > 0 && node.group_count <= self.leaf_size {
                target = Some(key);
            }
            cursor = node.parent;
        }
        let Some(target) = target else {
            return Ok(());
        };

        let mut gathered = Vec::with_capacity(self.node(target)?.group_count);
        let mut stack: NodeWorkBuffer = self.node(target)?.children().collect();
        while let Some(key) = stack.pop() {
            let node = self
                .nodes
                .remove(key)
                .ok_or(StructuralInvariantError::MissingNode { node: key })?;
            match node.contents {
                NodeContents::Leaf(groups) => gathered.extend(groups),
                NodeContents::Branch(children) => stack.extend(children.into_iter().flatten()),
            }
        }

        let mut max_radius: f64 = 0.0;
        for &gk in &gathered {
            let group = self.group_mut(gk)?;
            group.node = target;
            max_radius = max_radius.max(group.max_radius());
        }

        tracing::trace!(groups = gathered.len(), "collapsing spatial index branch");
        let node = self.node_mut(target)?;
        node.contents = NodeContents::Leaf(gathered);
        node.max_member_radius = max_radius;
        Ok(())
    }

    /// Recomputes cached radius bounds from `start` upwards, stopping at the
    /// first node whose bound is unchanged.
    fn refresh_radius_bounds(&mut self, start: NodeKey) -> Result<(), StructuralInvariantError> {
        let mut cursor = Some(start);
        while let Some(key) = cursor {
            let exact = self.exact_radius_bound(key)?;
            let node = self.node_mut(key)?;
            if node.max_member_radius == exact {
                break;
            }
            node.max_member_radius = exact;
            cursor = node.parent;
        }
        Ok(())
    }

    fn exact_radius_bound(&self, key: NodeKey) -> Result<f64, StructuralInvariantError> {
        let node = self.node(key)?;
        let mut bound: f64 = 0.0;
        match &node.contents {
            NodeContents::Leaf(groups) => {
                for &gk in groups {
                    bound = bound.max(self.group(gk)?.max_radius());
                }
            }
            NodeContents::Branch(_) => {
                for child in node.children() {
                    bound = bound.max(self.node(child)?.max_member_radius);
                }
            }
        }
        Ok(bound)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns `true` if `item` is stored at any position.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        match &self.item_groups {
            Some(map) => map.contains_key(item),
            None => self.groups.values().any(|group| group.contains_item(item)),
        }
    }

    /// Every stored item, each once, in unspecified order.
    #[must_use]
    pub fn all_members(&self) -> Vec<&T> {
        if let Some(map) = &self.item_groups {
            return map.keys().collect();
        }
        let mut seen = FastHashSet::default();
        self.iter()
            .map(|(_, item)| item)
            .filter(|item| seen.insert(*item))
            .collect()
    }

    /// Item whose position is closest to `position`, or `None` if the index
    /// is empty.
    ///
    /// Member radii are ignored. Among equally close positions the one found
    /// first wins; among items sharing the winning position, the earliest
    /// inserted surviving item is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::InvalidCoordinate`] for a non-finite coordinate.
    pub fn nearest_member(&self, position: [f64; D]) -> Result<Option<&T>, SpatialIndexError> {
        validate_position(&position)?;
        if self.is_empty() {
            return Ok(None);
        }

        let mut frontier = BinaryHeap::new();
        let root = self.node(self.root)?;
        frontier.push(Reverse((
            OrderedFloat(root.region.min_squared_distance(&position)),
            self.root,
        )));
        let mut best: Option<(f64, GroupKey)> = None;

        while let Some(Reverse((OrderedFloat(bound), key))) = frontier.pop() {
            if let Some((best_distance, _)) = best
                && bound >= best_distance
            {
                break;
            }
            let node = self.node(key)?;
            match &node.contents {
                NodeContents::Leaf(groups) => {
                    for &gk in groups {
                        let distance = squared_distance(self.group(gk)?.position(), &position);
                        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
                            best = Some((distance, gk));
                        }
                    }
                }
                NodeContents::Branch(_) => {
                    for child in node.children() {
                        let child_node = self.node(child)?;
                        frontier.push(Reverse((
                            OrderedFloat(child_node.region.min_squared_distance(&position)),
                            child,
                        )));
                    }
                }
            }
        }

        match best {
            Some((_, gk)) => Ok(self.group(gk)?.members().first().map(|m| &m.item)),
            None => Ok(None),
        }
    }

    /// Items whose position is closer to `position` than `radius` plus their
    /// member radius.
    ///
    /// # Errors
    ///
    /// Returns an [`ArgumentError`] for a non-finite coordinate or an invalid
    /// radius.
    pub fn members_in_sphere(
        &self,
        radius: f64,
        position: [f64; D],
    ) -> Result<Vec<&T>, SpatialIndexError> {
        validate_position(&position)?;
        validate_radius(radius)?;
        self.members_in_shape(&Sphere::new(position, radius))
    }

    /// Items whose position lies in the closed box `lower ≤ p ≤ upper`.
    ///
    /// An inverted box is empty. Infinite bounds are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::InvalidCoordinate`] for a NaN bound.
    pub fn members_in_rectanguloid(
        &self,
        lower: [f64; D],
        upper: [f64; D],
    ) -> Result<Vec<&T>, SpatialIndexError> {
        for bounds in [&lower, &upper] {
            if let Some(axis) = bounds.iter().position(|x| x.is_nan()) {
                return Err(ArgumentError::InvalidCoordinate {
                    axis,
                    value: bounds[axis],
                }
                .into());
            }
        }
        let query = Rectanguloid::new(lower, upper);
        if !query.is_valid() {
            return Ok(Vec::new());
        }
        self.members_in_shape(&query)
    }

    /// Items matching an arbitrary [`Shape`], each once.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialIndexError::Structural`] only if the tree is corrupt.
    pub fn members_in_shape<S: Shape<D>>(&self, shape: &S) -> Result<Vec<&T>, SpatialIndexError> {
        let mut found = Vec::new();
        let mut seen = FastHashSet::default();
        let mut stack = NodeWorkBuffer::new();
        stack.push(self.root);

        while let Some(key) = stack.pop() {
            let node = self.node(key)?;
            if node.group_count == 0 {
                continue;
            }
            match shape.classify(&node.region, node.max_member_radius) {
                Intersection::None => {}
                Intersection::Complete => self.collect_subtree(key, &mut found, &mut seen)?,
                Intersection::Partial => match &node.contents {
                    NodeContents::Leaf(groups) => {
                        for &gk in groups {
                            let group = self.group(gk)?;
                            for member in group.members() {
                                if shape.contains(group.position(), member.radius)
                                    && seen.insert(&member.item)
                                {
                                    found.push(&member.item);
                                }
                            }
                        }
                    }
                    NodeContents::Branch(_) => stack.extend(node.children()),
                },
            }
        }
        Ok(found)
    }

    fn collect_subtree<'a>(
        &'a self,
        start: NodeKey,
        found: &mut Vec<&'a T>,
        seen: &mut FastHashSet<&'a T>,
    ) -> Result<(), StructuralInvariantError> {
        let mut stack = NodeWorkBuffer::new();
        stack.push(start);
        while let Some(key) = stack.pop() {
            let node = self.node(key)?;
            match &node.contents {
                NodeContents::Leaf(groups) => {
                    for &gk in groups {
                        for member in self.group(gk)?.members() {
                            if seen.insert(&member.item) {
                                found.push(&member.item);
                            }
                        }
                    }
                }
                NodeContents::Branch(_) => stack.extend(node.children()),
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks every structural invariant of the tree.
    ///
    /// Verifies leaf/branch contents, aggregate group counts, parent and
    /// group back-links, that positions and child boxes lie inside their
    /// node's box, exact radius bounds, that no empty node or group lingers,
    /// and that the side map (if enabled) mirrors the tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`StructuralInvariantError`] found.
    pub fn is_valid(&self) -> Result<(), StructuralInvariantError> {
        let root = self.node(self.root)?;
        if root.parent.is_some() {
            return Err(StructuralInvariantError::BrokenParentLink {
                node: self.root,
                expected: None,
            });
        }

        let mut reached_nodes = 0;
        let mut reached_groups = 0;
        let mut reached_members = 0;
        let mut stack = NodeWorkBuffer::new();
        stack.push(self.root);

        while let Some(key) = stack.pop() {
            reached_nodes += 1;
            let node = self.node(key)?;
            if key != self.root && node.group_count == 0 {
                return Err(StructuralInvariantError::EmptyEntry { what: "node" });
            }

            let (actual_count, exact_radius) = match &node.contents {
                NodeContents::Leaf(groups) => {
                    let mut radius: f64 = 0.0;
                    for &gk in groups {
                        let group = self.group(gk)?;
                        if group.node != key {
                            return Err(StructuralInvariantError::BrokenGroupLink {
                                group: gk,
                                node: key,
                            });
                        }
                        if group.is_empty() {
                            return Err(StructuralInvariantError::EmptyEntry { what: "group" });
                        }
                        if !node.region.contains(group.position()) {
                            return Err(StructuralInvariantError::OutsideBounds { node: key });
                        }
                        reached_members += group.len();
                        radius = radius.max(group.max_radius());
                    }
                    reached_groups += groups.len();
                    (groups.len(), radius)
                }
                NodeContents::Branch(slots) => {
                    if slots.len() != 1 << D {
                        return Err(StructuralInvariantError::CountMismatch {
                            what: "child slots",
                            expected: 1 << D,
                            actual: slots.len(),
                        });
                    }
                    let mut count = 0;
                    let mut radius: f64 = 0.0;
                    for child in node.children() {
                        let child_node = self.node(child)?;
                        if child_node.parent != Some(key) {
                            return Err(StructuralInvariantError::BrokenParentLink {
                                node: child,
                                expected: Some(key),
                            });
                        }
                        if !node.region.encloses(&child_node.region) {
                            return Err(StructuralInvariantError::OutsideBounds { node: key });
                        }
                        count += child_node.group_count;
                        radius = radius.max(child_node.max_member_radius);
                        stack.push(child);
                    }
                    (count, radius)
                }
            };

            if actual_count != node.group_count {
                return Err(StructuralInvariantError::GroupCountMismatch {
                    node: key,
                    recorded: node.group_count,
                    actual: actual_count,
                });
            }
            if exact_radius != node.max_member_radius {
                return Err(StructuralInvariantError::StaleRadiusBound { node: key });
            }
        }

        for (what, expected, actual) in [
            ("reachable nodes", self.nodes.len(), reached_nodes),
            ("reachable groups", self.groups.len(), reached_groups),
            ("stored members", self.len, reached_members),
        ] {
            if expected != actual {
                return Err(StructuralInvariantError::CountMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }

        if let Some(map) = &self.item_groups {
            self.validate_side_map(map)?;
        }
        Ok(())
    }

    fn validate_side_map(
        &self,
        map: &FastHashMap<T, GroupKeyBuffer>,
    ) -> Result<(), StructuralInvariantError> {
        let mut entries = 0;
        for (item, keys) in map {
            if keys.is_empty() {
                return Err(StructuralInvariantError::SideMapMismatch {
                    message: "item mapped to no groups".to_string(),
                });
            }
            let distinct: FastHashSet<GroupKey> = keys.iter().copied().collect();
            if distinct.len() != keys.len() {
                return Err(StructuralInvariantError::SideMapMismatch {
                    message: "item mapped to the same group twice".to_string(),
                });
            }
            for &gk in keys {
                if !self.group(gk)?.contains_item(item) {
                    return Err(StructuralInvariantError::SideMapMismatch {
                        message: format!("group {gk:?} does not hold its mapped item"),
                    });
                }
            }
            entries += keys.len();
        }
        if entries != self.len {
            return Err(StructuralInvariantError::SideMapMismatch {
                message: format!("{entries} mapped pairs for {} stored members", self.len),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn index_2d(leaf_size: usize, fast_removals: bool) -> SpatialIndex<u32, 2> {
        let config = SpatialIndexConfigBuilder::default()
            .lower_bounds([0.0, 0.0])
            .upper_bounds([100.0, 100.0])
            .leaf_size(leaf_size)
            .fast_removals(fast_removals)
            .build()
            .unwrap();
        SpatialIndex::new(config).unwrap()
    }

    fn sorted(mut items: Vec<&u32>) -> Vec<u32> {
        items.sort_unstable();
        items.into_iter().copied().collect()
    }

    #[test]
    fn test_configuration_errors() {
        let zero_leaf = SpatialIndexConfigBuilder::default()
            .lower_bounds([0.0])
            .upper_bounds([1.0])
            .leaf_size(0)
            .build();
        assert_eq!(
            zero_leaf,
            Err(ConfigurationError::InvalidLeafSize { leaf_size: 0 })
        );

        let missing = SpatialIndexConfigBuilder::<2>::default()
            .lower_bounds([0.0, 0.0])
            .build();
        assert!(matches!(
            missing,
            Err(ConfigurationError::MissingField { .. })
        ));

        let nan = SpatialIndex::<u32, 2>::with_bounds([0.0, f64::NAN], [1.0, 1.0]);
        assert!(matches!(
            nan,
            Err(ConfigurationError::NonFiniteBounds { axis: 1, .. })
        ));

        let zero_dimension = SpatialIndex::<u32, 0>::with_bounds([], []);
        assert!(matches!(
            zero_dimension,
            Err(ConfigurationError::UnsupportedDimension { dimension: 0, .. })
        ));
    }

    #[test]
    fn test_argument_errors_leave_index_unchanged() {
        let mut index = index_2d(4, true);
        index.insert([1.0, 1.0], 1).unwrap();

        assert!(matches!(
            index.insert([f64::NAN, 0.0], 2),
            Err(SpatialIndexError::Argument(ArgumentError::InvalidCoordinate { axis: 0, .. }))
        ));
        assert!(matches!(
            index.insert_with_radius([1.0, 1.0], 3, -1.0),
            Err(SpatialIndexError::Argument(ArgumentError::InvalidRadius { .. }))
        ));
        assert!(matches!(
            index.members_in_sphere(f64::INFINITY, [0.0, 0.0]),
            Err(SpatialIndexError::Argument(ArgumentError::InvalidRadius { .. }))
        ));
        assert!(matches!(
            index.nearest_member([0.0, f64::INFINITY]),
            Err(SpatialIndexError::Argument(ArgumentError::InvalidCoordinate { axis: 1, .. }))
        ));
        assert_eq!(index.len(), 1);
        index.is_valid().unwrap();
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut index = index_2d(2, false);
        assert!(index.insert([5.0, 5.0], 1).unwrap());
        assert!(!index.insert([5.0, 5.0], 1).unwrap());
        assert!(index.insert([5.0, 5.0], 2).unwrap());
        assert!(index.insert([6.0, 5.0], 1).unwrap());
        assert_eq!(index.len(), 3);
        assert_eq!(index.group_count(), 2);
        assert_eq!(sorted(index.all_members()), vec![1, 2]);
        index.is_valid().unwrap();
    }

    #[test]
    fn test_identical_positions_never_split() {
        let mut index = index_2d(1, true);
        for item in 0..50 {
            index.insert([42.0, 42.0], item).unwrap();
        }
        assert_eq!(index.group_count(), 1);
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.members_in_sphere(0.5, [42.0, 42.0]).unwrap().len(), 50);
        index.is_valid().unwrap();
    }

    #[test]
    fn test_split_and_collapse_round_trip() {
        let mut index = index_2d(3, false);
        let mut rng = StdRng::seed_from_u64(17);
        for item in 0..200 {
            let p = [rng.random_range(0.0..100.0), rng.random_range(0.0..100.0)];
            index.insert(p, item).unwrap();
        }
        assert!(index.node_count() > 1);
        index.is_valid().unwrap();

        for item in 0..198 {
            assert!(index.remove(&item).unwrap());
            index.is_valid().unwrap();
        }
        assert_eq!(index.len(), 2);
        assert_eq!(index.node_count(), 1);

        assert!(index.remove(&198).unwrap());
        assert!(index.remove(&199).unwrap());
        assert!(!index.remove(&199).unwrap());
        assert!(index.is_empty());
        assert_eq!(index.node_count(), 1);
        index.is_valid().unwrap();
    }

    #[test]
    fn test_root_grows_to_cover_far_positions() {
        let mut index = index_2d(2, true);
        for (item, p) in [[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]].into_iter().enumerate() {
            index.insert(p, u32::try_from(item).unwrap()).unwrap();
        }
        index.insert([-250.0, 730.0], 99).unwrap();
        let (lower, upper) = index.bounds();
        assert!(lower[0] <= -250.0 && upper[1] >= 730.0);
        index.is_valid().unwrap();

        assert_eq!(index.nearest_member([-200.0, 700.0]).unwrap(), Some(&99));
        assert!(index.remove(&99).unwrap());
        index.is_valid().unwrap();
        assert_eq!(index.nearest_member([-200.0, 700.0]).unwrap(), Some(&2));
    }

    #[test]
    fn test_empty_root_expands_in_place() {
        let mut index: SpatialIndex<u32, 3> =
            SpatialIndex::with_bounds([0.0; 3], [1.0; 3]).unwrap();
        index.insert([1000.0, -5.0, 3.0], 7).unwrap();
        assert_eq!(index.node_count(), 1);
        assert!(index.contains(&7));
        index.is_valid().unwrap();
    }

    #[test]
    fn test_zero_extent_axis_is_widened() {
        let index: SpatialIndex<u32, 2> =
            SpatialIndex::with_bounds([3.0, 0.0], [3.0, 1.0]).unwrap();
        let (lower, upper) = index.bounds();
        assert_eq!(lower, [2.5, 0.0]);
        assert_eq!(upper, [3.5, 1.0]);
    }

    #[test]
    fn test_member_radii_in_sphere_queries() {
        let mut index = index_2d(2, false);
        index.insert_with_radius([10.0, 10.0], 1, 5.0).unwrap();
        index.insert_with_radius([50.0, 50.0], 2, 0.5).unwrap();
        index.insert([52.0, 50.0], 3).unwrap();
        index.insert([90.0, 90.0], 4).unwrap();

        assert_eq!(sorted(index.members_in_sphere(0.0, [13.0, 10.0]).unwrap()), vec![1]);
        assert_eq!(sorted(index.members_in_sphere(0.0, [50.2, 50.0]).unwrap()), vec![2]);
        assert_eq!(sorted(index.members_in_sphere(2.5, [51.0, 50.0]).unwrap()), vec![2, 3]);
        assert!(index.members_in_sphere(0.0, [16.0, 10.0]).unwrap().is_empty());

        assert!(index.remove(&1).unwrap());
        index.is_valid().unwrap();
        assert!(index.members_in_sphere(0.0, [13.0, 10.0]).unwrap().is_empty());
    }

    #[test]
    fn test_rectanguloid_query_is_closed_and_handles_inverted_box() {
        let mut index = index_2d(2, false);
        index.insert([10.0, 10.0], 1).unwrap();
        index.insert([20.0, 20.0], 2).unwrap();
        index.insert([30.0, 30.0], 3).unwrap();

        let hits = index.members_in_rectanguloid([10.0, 10.0], [20.0, 20.0]).unwrap();
        assert_eq!(sorted(hits), vec![1, 2]);
        assert!(index
            .members_in_rectanguloid([25.0, 0.0], [5.0, 100.0])
            .unwrap()
            .is_empty());
        let everything = index
            .members_in_rectanguloid([f64::NEG_INFINITY; 2], [f64::INFINITY; 2])
            .unwrap();
        assert_eq!(everything.len(), 3);
        assert!(index.members_in_rectanguloid([f64::NAN, 0.0], [1.0, 1.0]).is_err());
    }

    #[test]
    fn test_item_at_several_positions_is_reported_once() {
        for fast in [false, true] {
            let mut index = index_2d(1, fast);
            for x in 0..10 {
                index.insert([f64::from(x), 1.0], 5).unwrap();
            }
            index.insert([3.5, 1.0], 6).unwrap();
            assert_eq!(index.len(), 11);
            assert_eq!(sorted(index.all_members()), vec![5, 6]);
            assert_eq!(
                sorted(index.members_in_sphere(100.0, [5.0, 1.0]).unwrap()),
                vec![5, 6]
            );
            assert!(index.remove(&5).unwrap());
            assert_eq!(index.len(), 1);
            assert_eq!(index.group_count(), 1);
            index.is_valid().unwrap();
        }
    }

    #[test]
    fn test_one_dimensional_index() {
        let mut index: SpatialIndex<u32, 1> = SpatialIndex::with_bounds([0.0], [1.0]).unwrap();
        for i in 0..100 {
            index.insert([f64::from(i) * 0.37], i).unwrap();
        }
        index.is_valid().unwrap();
        assert_eq!(
            sorted(index.members_in_sphere(0.5, [3.7]).unwrap()),
            vec![9, 10, 11]
        );
    }
}
