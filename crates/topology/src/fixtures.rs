//! Procedural meshes for tests.
//!
//! All fixtures are consistently oriented (counter-clockwise seen from the
//! outside) and carry area-weighted normals.

use std::collections::HashMap;

use glam::Vec3;

use crate::mesh::TriangleMesh;

/// `cells` x `cells` grid in the XY plane, normals along +Z
///
/// Vertex `(i, j)` has index `j * (cells + 1) + i`; each cell is split
/// along its (i, j)-(i+1, j+1) diagonal, so interior vertices have valence 6.
pub fn flat_grid(cells: u32, spacing: f32) -> TriangleMesh {
    let side = cells + 1;
    let mut positions = Vec::with_capacity((side * side) as usize);
    for j in 0..side {
        for i in 0..side {
            positions.push(Vec3::new(i as f32 * spacing, j as f32 * spacing, 0.0));
        }
    }

    let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
    for j in 0..cells {
        for i in 0..cells {
            let a = j * side + i;
            let b = a + 1;
            let c = a + side + 1;
            let d = a + side;
            indices.extend([a, b, c, a, c, d]);
        }
    }

    build(positions, indices)
}

/// Open cylinder around the Z axis
pub fn cylinder(segments: u32, rows: u32, radius: f32, height_step: f32) -> TriangleMesh {
    let mut positions = Vec::with_capacity((segments * (rows + 1)) as usize);
    for j in 0..=rows {
        for i in 0..segments {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            positions.push(Vec3::new(
                radius * angle.cos(),
                radius * angle.sin(),
                j as f32 * height_step,
            ));
        }
    }

    let mut indices = Vec::with_capacity((segments * rows * 6) as usize);
    for j in 0..rows {
        for i in 0..segments {
            let a = j * segments + i;
            let b = j * segments + (i + 1) % segments;
            let c = b + segments;
            let d = a + segments;
            indices.extend([a, b, c, a, c, d]);
        }
    }

    build(positions, indices)
}

/// Icosahedron subdivided `subdivisions` times and projected onto a sphere
pub fn icosphere(subdivisions: u32, radius: f32) -> TriangleMesh {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut positions: Vec<Vec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut triangles: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
            let key = if a < b { (a, b) } else { (b, a) };
            *midpoints.entry(key).or_insert_with(|| {
                let p = (positions[a as usize] + positions[b as usize]).normalize();
                positions.push(p);
                (positions.len() - 1) as u32
            })
        };

        let mut refined = Vec::with_capacity(triangles.len() * 4);
        for [a, b, c] in triangles {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            refined.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        triangles = refined;
    }

    let positions = positions.into_iter().map(|p| p * radius).collect();
    build(positions, triangles.into_iter().flatten().collect())
}

fn build(positions: Vec<Vec3>, indices: Vec<u32>) -> TriangleMesh {
    let normals = vec![Vec3::ZERO; positions.len()];
    let mut mesh = TriangleMesh {
        positions,
        normals,
        indices,
    };
    mesh.recalculate_normals();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosphere_counts() {
        let mesh = icosphere(2, 1.0);
        // V = 10 * 4^n + 2, F = 20 * 4^n
        assert_eq!(mesh.vertex_count(), 162);
        assert_eq!(mesh.triangle_count(), 320);
    }

    #[test]
    fn test_icosphere_normals_point_outward() {
        let mesh = icosphere(1, 3.0);
        for (p, n) in mesh.positions().iter().zip(mesh.normals()) {
            assert!((p.length() - 3.0).abs() < 1e-4);
            assert!(p.normalize().dot(*n) > 0.95, "normal {n:?} at {p:?} points inward");
        }
    }

    #[test]
    fn test_cylinder_normals_are_radial() {
        let mesh = cylinder(16, 3, 2.0, 0.5);
        let side = 16;
        for v in side..2 * side {
            let p = mesh.positions()[v];
            let radial = Vec3::new(p.x, p.y, 0.0).normalize();
            assert!(radial.dot(mesh.normals()[v]) > 0.99);
        }
    }
}
