//! Merge coincident vertices and keep the way back to the source mesh.

use std::collections::HashMap;

use crate::mesh::TriangleMesh;

/// A mesh whose coincident vertices have been merged
///
/// Renderable meshes duplicate vertices at seams and hard edges, which
/// would cut one-rings open. Welding restores a connected surface for
/// curvature estimation; [`WeldedMesh::scatter`] copies per-vertex results
/// back onto every source vertex that was merged.
#[derive(Debug, Clone)]
pub struct WeldedMesh {
    pub mesh: TriangleMesh,
    /// Source vertex -> merged vertex
    to_merged: Vec<u32>,
    /// Merged vertex -> source vertices it absorbed
    merged_to_source: Vec<Vec<u32>>,
    /// Triangles dropped because they collapsed during the merge
    dropped_triangles: usize,
}

impl WeldedMesh {
    /// Weld vertices whose positions quantize to the same key
    ///
    /// `precision` is the quantization scale (1e6 merges positions closer
    /// than about a micrometer per axis). Normals are recomputed from the
    /// welded topology.
    pub fn weld(source: &TriangleMesh, precision: f32) -> Self {
        let quantize = |p: glam::Vec3| -> [i64; 3] {
            [
                (p.x * precision).round() as i64,
                (p.y * precision).round() as i64,
                (p.z * precision).round() as i64,
            ]
        };

        let mut key_to_merged: HashMap<[i64; 3], u32> = HashMap::new();
        let mut to_merged = Vec::with_capacity(source.vertex_count());
        let mut merged_to_source: Vec<Vec<u32>> = Vec::new();
        let mut positions = Vec::new();
        let mut normals = Vec::new();

        for (i, &position) in source.positions().iter().enumerate() {
            let merged = *key_to_merged.entry(quantize(position)).or_insert_with(|| {
                positions.push(position);
                normals.push(source.normals()[i]);
                merged_to_source.push(Vec::new());
                (positions.len() - 1) as u32
            });
            merged_to_source[merged as usize].push(i as u32);
            to_merged.push(merged);
        }

        // Remove degenerate triangles (two or more identical vertices after welding)
        let mut indices = Vec::with_capacity(source.corner_count());
        let mut dropped_triangles = 0usize;
        for triangle in 0..source.triangle_count() {
            let [a, b, c] = source.triangle(triangle).map(|v| to_merged[v]);
            if a == b || b == c || a == c {
                dropped_triangles += 1;
                continue;
            }
            indices.extend([a, b, c]);
        }

        let welded_count = source.vertex_count() - positions.len();
        tracing::debug!(
            "WeldedMesh::weld: welded {} duplicate vertices ({} unique of {} total), dropped {} triangles",
            welded_count,
            positions.len(),
            source.vertex_count(),
            dropped_triangles
        );

        // Indices come from the merged vertex set, so no range check is needed
        let mut mesh = TriangleMesh {
            positions,
            normals,
            indices,
        };
        mesh.recalculate_normals();

        Self {
            mesh,
            to_merged,
            merged_to_source,
            dropped_triangles,
        }
    }

    /// Merged vertex that a source vertex maps to
    pub fn merged_index(&self, source_vertex: usize) -> Option<usize> {
        self.to_merged.get(source_vertex).map(|&m| m as usize)
    }

    /// Source vertices absorbed into a merged vertex
    pub fn source_vertices(&self, merged_vertex: usize) -> &[u32] {
        self.merged_to_source
            .get(merged_vertex)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn source_vertex_count(&self) -> usize {
        self.to_merged.len()
    }

    pub fn dropped_triangles(&self) -> usize {
        self.dropped_triangles
    }

    /// Copy per-merged-vertex values onto the source vertices
    pub fn scatter<T: Clone>(&self, merged_values: &[T]) -> Vec<T> {
        self.to_merged
            .iter()
            .map(|&m| merged_values[m as usize].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_weld_undoes_corner_split() {
        let mesh = fixtures::flat_grid(3, 1.0);
        let split = mesh.split_corners();
        assert_eq!(split.vertex_count(), mesh.corner_count());

        let welded = WeldedMesh::weld(&split, 1e6);
        assert_eq!(welded.mesh.vertex_count(), mesh.vertex_count());
        assert_eq!(welded.mesh.triangle_count(), mesh.triangle_count());
        assert_eq!(welded.dropped_triangles(), 0);
        assert_eq!(welded.source_vertex_count(), split.vertex_count());
    }

    #[test]
    fn test_scatter_reaches_every_duplicate() {
        let split = fixtures::flat_grid(2, 1.0).split_corners();
        let welded = WeldedMesh::weld(&split, 1e6);

        let ids: Vec<usize> = (0..welded.mesh.vertex_count()).collect();
        let scattered = welded.scatter(&ids);

        assert_eq!(scattered.len(), split.vertex_count());
        for (source, merged) in scattered.iter().enumerate() {
            assert_eq!(welded.merged_index(source), Some(*merged));
            assert_eq!(
                split.positions()[source],
                welded.mesh.positions()[*merged],
                "source {source} scattered from the wrong merged vertex"
            );
            assert!(welded.source_vertices(*merged).contains(&(source as u32)));
        }
    }

    #[test]
    fn test_collapsed_triangles_are_dropped() {
        let mesh = TriangleMesh::with_computed_normals(
            vec![
                glam::Vec3::ZERO,
                glam::Vec3::X,
                glam::Vec3::Y,
                glam::Vec3::new(1e-9, 0.0, 0.0),
            ],
            vec![0, 1, 2, 0, 3, 2],
        )
        .unwrap();
        let welded = WeldedMesh::weld(&mesh, 1e6);

        assert_eq!(welded.mesh.vertex_count(), 3);
        assert_eq!(welded.mesh.triangle_count(), 1);
        assert_eq!(welded.dropped_triangles(), 1);
    }
}
