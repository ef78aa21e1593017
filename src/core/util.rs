//! General helper utilities.

pub mod spiral_ordering;

pub use spiral_ordering::SpiralOrdering;
