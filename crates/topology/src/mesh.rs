//! Validated triangle mesh buffers.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::TopologyError;

/// Indexed triangle mesh
///
/// Positions and normals are per vertex; `indices` holds three vertex
/// indices per triangle. Vertices may be shared between triangles or
/// duplicated per corner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawTriangleMesh")]
pub struct TriangleMesh {
    pub(crate) positions: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) indices: Vec<u32>,
}

/// Unchecked buffers as they appear on the wire
#[derive(Deserialize)]
struct RawTriangleMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
}

impl TryFrom<RawTriangleMesh> for TriangleMesh {
    type Error = TopologyError;

    fn try_from(raw: RawTriangleMesh) -> Result<Self, Self::Error> {
        Self::new(raw.positions, raw.normals, raw.indices)
    }
}

impl TriangleMesh {
    /// Build a mesh, checking buffer lengths and index ranges
    pub fn new(
        positions: Vec<Vec3>,
        normals: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Result<Self, TopologyError> {
        if positions.len() != normals.len() {
            return Err(TopologyError::NormalCountMismatch {
                positions: positions.len(),
                normals: normals.len(),
            });
        }
        if positions.len() > u32::MAX as usize {
            return Err(TopologyError::TooManyVertices(positions.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(TopologyError::NotTriangles(indices.len()));
        }
        if let Some((corner, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, i)| **i as usize >= positions.len())
        {
            return Err(TopologyError::IndexOutOfRange {
                corner,
                index,
                vertex_count: positions.len(),
            });
        }

        Ok(Self {
            positions,
            normals,
            indices,
        })
    }

    /// Build a mesh and derive area-weighted vertex normals
    pub fn with_computed_normals(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
    ) -> Result<Self, TopologyError> {
        let normals = vec![Vec3::ZERO; positions.len()];
        let mut mesh = Self::new(positions, normals, indices)?;
        mesh.recalculate_normals();
        Ok(mesh)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn corner_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex referenced by a corner
    #[inline]
    pub fn corner_vertex(&self, corner: usize) -> usize {
        self.indices[corner] as usize
    }

    /// The three vertex indices of a triangle
    #[inline]
    pub fn triangle(&self, triangle: usize) -> [usize; 3] {
        let base = triangle * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Unnormalized face normal (length is twice the triangle area)
    pub fn face_normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.triangle(triangle);
        let pa = self.positions[a];
        (self.positions[b] - pa).cross(self.positions[c] - pa)
    }

    // ========================================================================
    // Derived meshes
    // ========================================================================

    /// Recompute vertex normals as the area-weighted sum of face normals
    ///
    /// Vertices without a non-degenerate incident triangle keep their
    /// previous normal.
    pub fn recalculate_normals(&mut self) {
        let mut accumulated = vec![Vec3::ZERO; self.positions.len()];
        for triangle in 0..self.triangle_count() {
            let normal = self.face_normal(triangle);
            for vertex in self.triangle(triangle) {
                accumulated[vertex] += normal;
            }
        }
        for (normal, sum) in self.normals.iter_mut().zip(accumulated) {
            if let Some(n) = sum.try_normalize() {
                *normal = n;
            }
        }
    }

    /// Duplicate vertices so that every corner owns its own vertex
    ///
    /// Corner `c` of the result references vertex `c`.
    pub fn split_corners(&self) -> TriangleMesh {
        let positions = self
            .indices
            .iter()
            .map(|&i| self.positions[i as usize])
            .collect();
        let normals = self
            .indices
            .iter()
            .map(|&i| self.normals[i as usize])
            .collect();
        let indices = (0..self.indices.len() as u32).collect();

        TriangleMesh {
            positions,
            normals,
            indices,
        }
    }
}
