//! Greedy triangle flood fill that picks consistent cross-field representatives.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crosshatch_config::FloodMode;
use topology::{TriangleMesh, VertexTriangles};

use crate::types::CurvatureField;

/// A new combination must beat the current best by this much
const IMPROVEMENT_MARGIN: f32 = 0.05;

/// Turn choices for a frozen vertex
const KEEP: &[usize] = &[0];

/// Summary of one flood fill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodFillReport {
    pub triangles_visited: usize,
    /// Vertices whose representative was relabeled
    pub vertices_changed: usize,
    /// Seed triangles used (connected mode restarts once per component)
    pub components: usize,
}

/// Relabel each vertex's four-fold set so neighboring base directions agree
///
/// Triangles are visited once each. For a triangle, every combination of
/// quarter turns (or half turns with `sign_only`) for its unfrozen vertices
/// is scored by the sum of pairwise dot products between the chosen
/// representatives; frozen vertices keep their current one. The winner is
/// applied and all three vertices are frozen.
///
/// `field` must hold one sample per mesh vertex; the public entry point is
/// [`super::FieldSmoothingContext::flood_fill`], which checks it.
pub(crate) fn flood_fill(
    mesh: &TriangleMesh,
    adjacency: &VertexTriangles,
    field: &mut CurvatureField,
    mode: FloodMode,
    sign_only: bool,
) -> FloodFillReport {
    let triangle_count = mesh.triangle_count();
    let mut frozen = vec![false; mesh.vertex_count()];
    let mut report = FloodFillReport::default();

    match mode {
        FloodMode::Raster => {
            for triangle in 0..triangle_count {
                align_triangle(mesh, field, &mut frozen, triangle, sign_only, &mut report);
            }
            if triangle_count > 0 {
                report.components = 1;
            }
        }
        FloodMode::Connected => {
            let mut queued = vec![false; triangle_count];
            let mut queue = VecDeque::new();
            for seed in 0..triangle_count {
                if queued[seed] {
                    continue;
                }
                queued[seed] = true;
                queue.push_back(seed);
                report.components += 1;

                while let Some(triangle) = queue.pop_front() {
                    align_triangle(mesh, field, &mut frozen, triangle, sign_only, &mut report);
                    for vertex in mesh.triangle(triangle) {
                        for &next in adjacency.of(vertex) {
                            if !queued[next] {
                                queued[next] = true;
                                queue.push_back(next);
                            }
                        }
                    }
                }
            }
        }
    }

    tracing::debug!(
        "flood_fill: visited {} triangles in {} components, relabeled {} vertices",
        report.triangles_visited,
        report.components,
        report.vertices_changed
    );
    report
}

fn align_triangle(
    mesh: &TriangleMesh,
    field: &mut CurvatureField,
    frozen: &mut [bool],
    triangle: usize,
    sign_only: bool,
    report: &mut FloodFillReport,
) {
    let vertices = mesh.triangle(triangle);
    let turns: &'static [usize] = if sign_only { &[0, 2] } else { &[0, 1, 2, 3] };
    let options = |v: usize| if frozen[v] { KEEP } else { turns };
    let sets = vertices.map(|v| field.samples[v].directions);

    let mut best = -3.0_f32;
    let mut best_turns = [0usize; 3];
    for &ka in options(vertices[0]) {
        let a = sets[0].get(ka);
        for &kb in options(vertices[1]) {
            let b = sets[1].get(kb);
            for &kc in options(vertices[2]) {
                let c = sets[2].get(kc);
                let score = a.dot(b) + b.dot(c) + a.dot(c);
                if score > best + IMPROVEMENT_MARGIN {
                    best = score;
                    best_turns = [ka, kb, kc];
                }
            }
        }
    }

    for (vertex, turn) in vertices.into_iter().zip(best_turns) {
        if turn != 0 {
            let sample = &mut field.samples[vertex];
            sample.directions = sample.directions.cycled(turn);
            report.vertices_changed += 1;
        }
        frozen[vertex] = true;
    }
    report.triangles_visited += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurvatureSample, FourfoldDirections, VertexStatus};
    use glam::Vec3;
    use topology::fixtures;

    fn field_from_angles(angles: impl Iterator<Item = f32>) -> CurvatureField {
        let samples = angles
            .map(|a| {
                let base = Vec3::new(a.cos(), a.sin(), 0.0);
                CurvatureSample {
                    k1: 0.0,
                    k2: 1.0,
                    minor_direction: base,
                    major_direction: Vec3::Z.cross(base),
                    normal: Vec3::Z,
                    directions: FourfoldDirections::from_base(base, Vec3::Z).unwrap(),
                    ratio: 1.0,
                    status: VertexStatus::Estimated,
                    open_ring: false,
                }
            })
            .collect();
        CurvatureField { samples }
    }

    #[test]
    fn test_consistent_field_is_untouched() {
        let mesh = fixtures::flat_grid(4, 1.0);
        let adjacency = VertexTriangles::build(&mesh);
        let mut field = field_from_angles((0..mesh.vertex_count()).map(|_| 0.3));
        let before = field.clone();

        for mode in [FloodMode::Connected, FloodMode::Raster] {
            let report = flood_fill(&mesh, &adjacency, &mut field, mode, false);
            assert_eq!(report.vertices_changed, 0);
            assert_eq!(report.triangles_visited, mesh.triangle_count());
            assert_eq!(field, before);
        }
    }

    #[test]
    fn test_scrambled_labels_are_aligned_and_idempotent() {
        let mesh = fixtures::flat_grid(5, 1.0);
        let adjacency = VertexTriangles::build(&mesh);
        // Same cross everywhere, different representative per vertex
        let mut field = field_from_angles(
            (0..mesh.vertex_count()).map(|v| 0.2 + (v % 4) as f32 * std::f32::consts::FRAC_PI_2),
        );

        let first = flood_fill(&mesh, &adjacency, &mut field, FloodMode::Connected, false);
        assert!(first.vertices_changed > 0);
        assert_eq!(first.components, 1);

        let reference = field.samples[0].directions.base();
        for (v, s) in field.samples.iter().enumerate() {
            assert!(
                s.directions.base().dot(reference) > 0.999,
                "vertex {v} still disagrees"
            );
        }

        let aligned = field.clone();
        let second = flood_fill(&mesh, &adjacency, &mut field, FloodMode::Connected, false);
        assert_eq!(second.vertices_changed, 0);
        assert_eq!(field, aligned);
    }

    #[test]
    fn test_sign_only_flips_opposites() {
        let mesh = fixtures::flat_grid(3, 1.0);
        let adjacency = VertexTriangles::build(&mesh);
        let mut field = field_from_angles(
            (0..mesh.vertex_count()).map(|v| if v % 2 == 0 { 0.0 } else { std::f32::consts::PI }),
        );

        flood_fill(&mesh, &adjacency, &mut field, FloodMode::Raster, true);
        let reference = field.samples[0].directions.base();
        for s in &field.samples {
            assert!(s.directions.base().dot(reference) > 0.999);
        }
    }
}
