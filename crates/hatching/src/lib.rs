//! Streamline hatching over rendered direction fields
//!
//! This crate places evenly spaced, direction-following lines on an image:
//! - [`codec`] - RG direction encoding of rendered textures
//! - [`raster`] - CPU direction raster with paint mask
//! - [`field`] - multi-layer field and four-fold direction disambiguation
//! - [`grid`] - uniform grid for separation queries
//! - [`tracer`] - the evenly-spaced streamline tracer
//! - [`crosshatch`] - perpendicular second pass

pub mod codec;
pub mod crosshatch;
pub mod field;
pub mod grid;
pub mod raster;
pub mod tracer;
pub mod types;

pub use codec::*;
pub use crosshatch::hatch;
pub use field::DirectionField;
pub use grid::{GridPoint, SpatialGrid};
pub use raster::DirectionRaster;
pub use tracer::HatchingSession;
pub use types::*;
