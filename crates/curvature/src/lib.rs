//! Principal curvature estimation and cross-field smoothing
//!
//! This crate turns a triangle mesh into a smooth four-fold direction field
//! suitable for hatching:
//! - [`estimator`] - per-vertex exponential map, quadratic patch fit and
//!   principal curvatures/directions
//! - [`reliability`] - curvature anisotropy ratio and the reliability mask
//! - [`crossfield`] - energy smoothing and flood-fill relabeling
//! - [`lbfgs`] - limited-memory quasi-Newton minimizer used by the energy pass
//! - [`directions`] - rotation about normals and vertex-color encodings
//! - [`uv`] - projection of surface directions into texture space
//! - [`pipeline`] - weld, estimate, smooth and scatter in one call

pub mod crossfield;
pub mod directions;
pub mod estimator;
pub mod lbfgs;
pub mod pipeline;
pub mod reliability;
pub mod types;
pub mod uv;

pub use crossfield::energy::{MaskedEnergy, SmoothingEnergy, UnmaskedEnergy};
pub use crossfield::flood_fill::FloodFillReport;
pub use crossfield::{FieldSmoothingContext, SmoothingReport, smooth_cross_field};
pub use directions::*;
pub use estimator::{estimate_curvature, estimate_vertex, estimate_with_rings};
pub use lbfgs::{Lbfgs, LbfgsReport, Termination};
pub use pipeline::{CrossFieldResult, CurvaturePipeline};
pub use reliability::{ReliabilityMask, curvature_ratio};
pub use types::*;
pub use uv::project_directions_to_uv;
