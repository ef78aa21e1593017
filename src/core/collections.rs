//! High-performance collection types used by the spatial index and the
//! triangulation algorithms.
//!
//! - [`FastHashMap`]/[`FastHashSet`]: `rustc-hash` backed maps and sets for
//!   trusted, internal keys.
//! - [`SmallBuffer`]: `smallvec` backed buffers that stay inline for the common
//!   small sizes (child slots, edge owners, cavity boundaries).
//! - [`StorageMap`]: the `slotmap` arena holding nodes, groups, vertices and
//!   triangles.

mod aliases;
mod buffers;
mod helpers;

pub use aliases::*;
pub use buffers::*;
pub use helpers::*;
