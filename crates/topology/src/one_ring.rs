//! One-ring fans and vertex-triangle adjacency.

use crate::corner_table::{CornerTable, next, prev};
use crate::mesh::TriangleMesh;

/// Ordered fan of corners incident to one vertex
///
/// Each entry is a corner referencing the center vertex; consecutive entries
/// are triangles sharing an edge, ordered counter-clockwise for consistently
/// oriented meshes. When `closed` is false the fan hit a boundary and runs
/// from one boundary edge to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneRing {
    pub center: usize,
    pub corners: Vec<usize>,
    pub closed: bool,
}

impl OneRing {
    /// Walk the fan around the vertex of `start`
    ///
    /// Steps forward across shared edges until the walk returns to `start`.
    /// If it reaches a boundary it walks backward from `start` as well and
    /// the ring is reported open. Walks are capped at the corner count.
    pub fn walk(mesh: &TriangleMesh, table: &CornerTable, start: usize) -> Self {
        let center = mesh.corner_vertex(start);
        let cap = table.len();
        let at_center = |corner: usize| mesh.corner_vertex(corner) == center;

        let mut corners = vec![start];
        let mut closed = false;
        let mut current = start;

        for _ in 0..cap {
            let Some(across) = table.opposite(next(current)) else {
                break;
            };
            let candidate = next(across);
            if candidate == start {
                closed = true;
                break;
            }
            if !at_center(candidate) {
                tracing::warn!(
                    "OneRing::walk: inconsistent orientation around vertex {}",
                    center
                );
                break;
            }
            corners.push(candidate);
            current = candidate;
        }

        if !closed {
            let mut backward = Vec::new();
            current = start;
            for _ in 0..cap {
                let Some(across) = table.opposite(prev(current)) else {
                    break;
                };
                let candidate = prev(across);
                if !at_center(candidate) || candidate == start || corners.contains(&candidate) {
                    break;
                }
                backward.push(candidate);
                current = candidate;
            }
            backward.reverse();
            backward.extend(corners);
            corners = backward;
        }

        Self {
            center,
            corners,
            closed,
        }
    }

    /// Neighbor vertices in fan order
    ///
    /// A closed fan of `k` triangles has `k` neighbors; an open fan has one
    /// extra neighbor closing the last boundary edge.
    pub fn neighbors(&self, mesh: &TriangleMesh) -> Vec<usize> {
        let mut neighbors: Vec<usize> = self
            .corners
            .iter()
            .map(|&c| mesh.corner_vertex(next(c)))
            .collect();
        if !self.closed {
            if let Some(&last) = self.corners.last() {
                neighbors.push(mesh.corner_vertex(prev(last)));
            }
        }
        neighbors
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}

/// Build the fan of every vertex; vertices referenced by no triangle get `None`
pub fn one_rings(mesh: &TriangleMesh, table: &CornerTable) -> Vec<Option<OneRing>> {
    let mut first_corner = vec![None; mesh.vertex_count()];
    for corner in 0..mesh.corner_count() {
        let slot = &mut first_corner[mesh.corner_vertex(corner)];
        if slot.is_none() {
            *slot = Some(corner);
        }
    }

    let rings: Vec<Option<OneRing>> = first_corner
        .into_iter()
        .map(|start| start.map(|c| OneRing::walk(mesh, table, c)))
        .collect();

    let open = rings.iter().flatten().filter(|r| !r.closed).count();
    if open > 0 {
        tracing::debug!("one_rings: {} of {} vertices are on a boundary", open, rings.len());
    }
    rings
}

/// Vertex to incident-triangle adjacency stored as offsets into one flat list
#[derive(Debug, Clone)]
pub struct VertexTriangles {
    offsets: Vec<usize>,
    triangles: Vec<usize>,
}

impl VertexTriangles {
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut counts = vec![0usize; mesh.vertex_count() + 1];
        for corner in 0..mesh.corner_count() {
            counts[mesh.corner_vertex(corner) + 1] += 1;
        }
        for i in 1..counts.len() {
            counts[i] += counts[i - 1];
        }

        let offsets = counts.clone();
        let mut cursor = counts;
        let mut triangles = vec![0usize; mesh.corner_count()];
        for corner in 0..mesh.corner_count() {
            let vertex = mesh.corner_vertex(corner);
            triangles[cursor[vertex]] = corner / 3;
            cursor[vertex] += 1;
        }

        Self { offsets, triangles }
    }

    /// Triangles touching a vertex (empty for unknown vertices)
    pub fn of(&self, vertex: usize) -> &[usize] {
        match (self.offsets.get(vertex), self.offsets.get(vertex + 1)) {
            (Some(&start), Some(&end)) => &self.triangles[start..end],
            _ => &[],
        }
    }
}
