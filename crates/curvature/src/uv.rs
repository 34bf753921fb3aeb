//! Projection of per-vertex surface directions into texture space.

use glam::{Vec2, Vec3};

use topology::TriangleMesh;

use crate::types::{CurvatureError, check_len};

/// Express each vertex direction as a unit vector in UV space
///
/// For every triangle and corner `j`, the tip `p_j + d_j` is projected onto
/// the triangle's plane and its UV is interpolated with signed barycentric
/// coordinates; `uv(tip) - uv_j` is that triangle's estimate. Estimates
/// from all incident triangles are summed and normalized. Vertices with no
/// usable triangle get `Vec2::ZERO`.
pub fn project_directions_to_uv(
    mesh: &TriangleMesh,
    uvs: &[Vec2],
    directions: &[Vec3],
) -> Result<Vec<Vec2>, CurvatureError> {
    check_len("uvs", mesh.vertex_count(), uvs.len())?;
    check_len("directions", mesh.vertex_count(), directions.len())?;

    let positions = mesh.positions();
    let mut accumulated = vec![Vec2::ZERO; mesh.vertex_count()];

    for triangle in 0..mesh.triangle_count() {
        let vertices = mesh.triangle(triangle);
        let p = vertices.map(|v| positions[v]);
        let t = vertices.map(|v| uvs[v]);
        let Some(normal) = (p[1] - p[0]).cross(p[2] - p[0]).try_normalize() else {
            continue;
        };

        for (j, &vertex) in vertices.iter().enumerate() {
            let tip = p[j] + directions[vertex];
            let tip = tip - normal * (tip - p[0]).dot(normal);
            let Some([a, b, c]) = barycentric(p, normal, tip) else {
                continue;
            };
            let uv_tip = t[0] * a + t[1] * b + t[2] * c;
            accumulated[vertex] += uv_tip - t[j];
        }
    }

    Ok(accumulated.into_iter().map(Vec2::normalize_or_zero).collect())
}

/// Signed barycentric coordinates of an in-plane point
fn barycentric(p: [Vec3; 3], normal: Vec3, point: Vec3) -> Option<[f32; 3]> {
    let area = (p[1] - p[0]).cross(p[2] - p[0]).dot(normal);
    if area.abs() < f32::EPSILON {
        return None;
    }
    let a = (p[2] - p[1]).cross(point - p[1]).dot(normal) / area;
    let b = (p[0] - p[2]).cross(point - p[2]).dot(normal) / area;
    Some([a, b, 1.0 - a - b])
}
