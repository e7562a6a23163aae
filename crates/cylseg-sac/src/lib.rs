#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Inlier extraction.
pub mod extract;

/// Cylinder model primitives.
pub mod model;

/// Surface normal estimation.
pub mod normals;

/// Sample consensus cylinder segmentation.
pub mod sac;

mod detect;
pub use detect::*;
