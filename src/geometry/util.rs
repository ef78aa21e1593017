//! Geometric utility functions.
//!
//! Vector norms and products over `[f64; D]`, circumcircle computation for
//! planar and spherical triangles, geographic conversions, and seeded random
//! point generation for tests and benchmarks.

mod circumsphere;
mod conversions;
mod norms;
mod point_generation;

pub use circumsphere::*;
pub use conversions::*;
pub use norms::*;
pub use point_generation::*;

/// Errors from the random point generators.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RandomPointGenerationError {
    /// The sampling range is empty, inverted, or not finite.
    #[error("Invalid range: min ({min}) must be finite and less than max ({max})")]
    InvalidRange {
        /// Lower end of the requested range.
        min: f64,
        /// Upper end of the requested range.
        max: f64,
    },
}
