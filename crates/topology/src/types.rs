//! Error type for mesh construction.

/// Errors that can occur while building or validating a triangle mesh
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Index count {0} is not divisible by 3")]
    NotTriangles(usize),
    #[error("Index {index} at corner {corner} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        corner: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("Mesh has {positions} positions but {normals} normals")]
    NormalCountMismatch { positions: usize, normals: usize },
    #[error("Mesh has too many vertices for 32-bit indices: {0}")]
    TooManyVertices(usize),
}
