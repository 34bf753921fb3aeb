//! Triangle mesh connectivity for curvature estimation
//!
//! This crate provides the topology layer the curvature pipeline works on:
//! - [`TriangleMesh`] - validated position/normal/index buffers
//! - [`CornerTable`] - corner to opposite-corner lookup across shared edges
//! - [`OneRing`] - ordered fan of corners around a vertex
//! - [`VertexTriangles`] - vertex to incident-triangle adjacency
//! - [`WeldedMesh`] - coincident-vertex merge with a map back to the source mesh

mod corner_table;
mod mesh;
mod one_ring;
mod types;
mod validation;
mod weld;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use corner_table::{CornerTable, next, prev, triangle_of};
pub use mesh::TriangleMesh;
pub use one_ring::{OneRing, VertexTriangles, one_rings};
pub use types::TopologyError;
pub use weld::WeldedMesh;
