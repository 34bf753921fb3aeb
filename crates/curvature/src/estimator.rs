//! Per-vertex principal curvature estimation.
//!
//! Each vertex is handled independently:
//! 1. Its one-ring is flattened with a discrete exponential map (geodesic
//!    polar coordinates, angles rescaled to a full turn)
//! 2. A quadratic parametric patch is fitted to the neighbor offsets
//! 3. Principal curvatures and directions come from the fundamental forms
//!    of that patch
//!
//! Failures are local: a vertex whose fan cannot be fitted is reported as
//! [`VertexStatus::Degenerate`] with zero directions.

use std::f64::consts::TAU;

use glam::{DVec2, DVec3, Vec3};
use nalgebra::DMatrix;
use rayon::prelude::*;

use crosshatch_config::CurvatureConfig;
use topology::{CornerTable, OneRing, TriangleMesh, one_rings};

use crate::reliability::curvature_ratio;
use crate::types::{
    CurvatureError, CurvatureField, CurvatureSample, FourfoldDirections, VertexStatus, check_len,
};

/// Offsets shorter than this are treated as coincident neighbors
const MIN_OFFSET_LENGTH: f64 = 1e-12;

/// Geodesic polar coordinates of a one-ring
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialMap {
    pub radii: Vec<f64>,
    pub angles: Vec<f64>,
}

impl ExponentialMap {
    /// Parametric `(u, v)` coordinates of each neighbor
    pub fn uv(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.radii
            .iter()
            .zip(&self.angles)
            .map(|(r, phi)| (r * phi.cos(), r * phi.sin()))
    }
}

/// Build the exponential map of ordered neighbor offsets
///
/// The first neighbor sits at angle 0; each following neighbor adds the
/// angle between consecutive offsets. All angles are then scaled so that
/// the accumulated angle plus the closing angle back to the first neighbor
/// spans `2π`.
pub fn exponential_map(offsets: &[DVec3]) -> Option<ExponentialMap> {
    let first = *offsets.first()?;
    let mut radii = Vec::with_capacity(offsets.len());
    let mut directions = Vec::with_capacity(offsets.len());
    for offset in offsets {
        let r = offset.length();
        if r < MIN_OFFSET_LENGTH {
            return None;
        }
        radii.push(r);
        directions.push(*offset / r);
    }

    let mut angles = Vec::with_capacity(offsets.len());
    let mut accumulated = 0.0;
    angles.push(0.0);
    for pair in directions.windows(2) {
        accumulated += pair[0].dot(pair[1]).clamp(-1.0, 1.0).acos();
        angles.push(accumulated);
    }

    let last = directions[directions.len() - 1];
    let closing = last.dot(first / radii[0]).clamp(-1.0, 1.0).acos();
    let total = accumulated + closing;
    if total < MIN_OFFSET_LENGTH {
        return None;
    }

    let scale = TAU / total;
    for angle in &mut angles {
        *angle *= scale;
    }

    Some(ExponentialMap { radii, angles })
}

/// Coefficients of the fitted patch `F(u, v)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchFit {
    pub fu: DVec3,
    pub fv: DVec3,
    pub fuu: DVec3,
    pub fuv: DVec3,
    pub fvv: DVec3,
}

/// Solve `V·F ≈ Q` for the quadratic patch through the neighbor offsets
///
/// Rows of `V` are `[u, v, u²/2, uv, v²/2]`. Exactly five neighbors use the
/// plain inverse, fewer use the minimum-norm solution `Vᵀ(VVᵀ)⁻¹Q`, more use
/// the normal equations `(VᵀV)⁻¹VᵀQ`. Returns `None` if the system is
/// singular or the solution is not finite.
pub fn fit_patch(map: &ExponentialMap, offsets: &[DVec3]) -> Option<PatchFit> {
    let n = offsets.len();
    if n == 0 || map.radii.len() != n {
        return None;
    }

    let uv: Vec<(f64, f64)> = map.uv().collect();
    let v = DMatrix::from_fn(n, 5, |row, col| {
        let (u, v) = uv[row];
        match col {
            0 => u,
            1 => v,
            2 => u * u / 2.0,
            3 => u * v,
            _ => v * v / 2.0,
        }
    });
    let q = DMatrix::from_fn(n, 3, |row, col| offsets[row][col]);

    let f = match n.cmp(&5) {
        std::cmp::Ordering::Equal => v.try_inverse()? * q,
        std::cmp::Ordering::Less => {
            let inverse = (&v * v.transpose()).try_inverse()?;
            v.transpose() * inverse * q
        }
        std::cmp::Ordering::Greater => {
            let inverse = v.tr_mul(&v).try_inverse()?;
            inverse * v.transpose() * q
        }
    };

    if f.iter().any(|x| !x.is_finite()) {
        return None;
    }

    let row = |r: usize| DVec3::new(f[(r, 0)], f[(r, 1)], f[(r, 2)]);
    Some(PatchFit {
        fu: row(0),
        fv: row(1),
        fuu: row(2),
        fuv: row(3),
        fvv: row(4),
    })
}

/// Principal curvatures and directions of a patch, ordered `|k1| <= |k2|`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalFrame {
    pub k1: f64,
    pub k2: f64,
    /// Eigenvector of `k1` in the `(u, v)` basis
    pub dir1: DVec2,
    /// Eigenvector of `k2` in the `(u, v)` basis
    pub dir2: DVec2,
    pub normal: DVec3,
}

/// Eigen-decompose `W = I·II` built from the patch's fundamental forms
pub fn principal_frame(fit: &PatchFit) -> Option<PrincipalFrame> {
    let normal = fit.fu.cross(fit.fv).try_normalize()?;

    let e = fit.fu.dot(fit.fu);
    let f = fit.fu.dot(fit.fv);
    let g = fit.fv.dot(fit.fv);
    let l = fit.fuu.dot(normal);
    let m = fit.fuv.dot(normal);
    let n = fit.fvv.dot(normal);

    // [[a, b], [c, d]] = [[e, f], [f, g]] · [[l, m], [m, n]]
    let a = e * l + f * m;
    let b = e * m + f * n;
    let c = f * l + g * m;
    let d = f * m + g * n;

    let half_trace = (a + d) / 2.0;
    let det = a * d - b * c;
    let root = (half_trace * half_trace - det).max(0.0).sqrt();
    let (mut k1, mut k2) = (half_trace - root, half_trace + root);

    let mut dir1 = eigenvector(a, b, c, d, k1, DVec2::X);
    let mut dir2 = eigenvector(a, b, c, d, k2, DVec2::Y);
    if dir1.dot(dir2).abs() > 0.999 {
        dir2 = dir1.perp();
    }

    if k1.abs() > k2.abs() {
        std::mem::swap(&mut k1, &mut k2);
        std::mem::swap(&mut dir1, &mut dir2);
    }

    if !(k1.is_finite() && k2.is_finite()) {
        return None;
    }

    Some(PrincipalFrame {
        k1,
        k2,
        dir1,
        dir2,
        normal,
    })
}

/// Unit eigenvector of `[[a, b], [c, d]]` for eigenvalue `lambda`
fn eigenvector(a: f64, b: f64, c: f64, d: f64, lambda: f64, fallback: DVec2) -> DVec2 {
    let from_first_row = DVec2::new(b, lambda - a);
    let from_second_row = DVec2::new(lambda - d, c);
    let candidate = if from_first_row.length_squared() >= from_second_row.length_squared() {
        from_first_row
    } else {
        from_second_row
    };
    candidate.try_normalize().unwrap_or(fallback)
}

/// Map a `(u, v)` direction into 3D using the normalized patch tangents
///
/// `direction` is an eigenvector column of the shape operator, so its `u`
/// component weights `Fu` and its `v` component weights `Fv`. Pairing them
/// crosswise only holds for a row-wise eigenvector read and mirrors the
/// direction across `u = v`.
pub fn back_project(fit: &PatchFit, direction: DVec2) -> Option<DVec3> {
    let tu = fit.fu.try_normalize()?;
    let tv = fit.fv.try_normalize()?;
    (tu * direction.x + tv * direction.y).try_normalize()
}

/// Estimate curvature at a vertex given its ordered neighbor positions
pub fn estimate_vertex(
    center: Vec3,
    neighbors: &[Vec3],
    config: &CurvatureConfig,
) -> Option<CurvatureSample> {
    if neighbors.len() < config.min_ring_size.max(3) {
        return None;
    }

    let center = center.as_dvec3();
    let offsets: Vec<DVec3> = neighbors.iter().map(|p| p.as_dvec3() - center).collect();

    let map = exponential_map(&offsets)?;
    let fit = fit_patch(&map, &offsets)?;
    let frame = principal_frame(&fit)?;

    let minor = back_project(&fit, frame.dir1)?;
    let major = back_project(&fit, frame.dir2)?;
    let normal = frame.normal.as_vec3();
    let directions = FourfoldDirections::from_base(minor.as_vec3(), normal)?;

    let (k1, k2) = (frame.k1 as f32, frame.k2 as f32);
    Some(CurvatureSample {
        k1,
        k2,
        minor_direction: minor.as_vec3(),
        major_direction: major.as_vec3(),
        normal,
        directions,
        ratio: curvature_ratio(k1, k2, config.ratio_epsilon),
        status: VertexStatus::Estimated,
        open_ring: false,
    })
}

/// Estimate curvature at every vertex of `mesh`
///
/// Vertices are processed in parallel. The mesh is used as given; weld
/// duplicated vertices first (see [`topology::WeldedMesh`]) so that fans
/// are not cut open at seams.
pub fn estimate_curvature(mesh: &TriangleMesh, config: &CurvatureConfig) -> CurvatureField {
    let table = CornerTable::build(mesh.indices());
    let rings = one_rings(mesh, &table);
    compute_field(mesh, &rings, config)
}

/// Estimate curvature using precomputed one-rings, one per vertex
pub fn estimate_with_rings(
    mesh: &TriangleMesh,
    rings: &[Option<OneRing>],
    config: &CurvatureConfig,
) -> Result<CurvatureField, CurvatureError> {
    check_len("one-rings", mesh.vertex_count(), rings.len())?;
    Ok(compute_field(mesh, rings, config))
}

fn compute_field(
    mesh: &TriangleMesh,
    rings: &[Option<OneRing>],
    config: &CurvatureConfig,
) -> CurvatureField {
    let positions = mesh.positions();
    let normals = mesh.normals();

    let samples: Vec<CurvatureSample> = rings
        .par_iter()
        .enumerate()
        .map(|(vertex, ring)| {
            let fallback = CurvatureSample::degenerate(normals[vertex]);
            let Some(ring) = ring else {
                return fallback;
            };
            let neighbors: Vec<Vec3> = ring
                .neighbors(mesh)
                .into_iter()
                .map(|n| positions[n])
                .collect();
            match estimate_vertex(positions[vertex], &neighbors, config) {
                Some(sample) => CurvatureSample {
                    open_ring: !ring.closed,
                    ..sample
                },
                None => CurvatureSample {
                    open_ring: !ring.closed,
                    ..fallback
                },
            }
        })
        .collect();

    let field = CurvatureField { samples };
    let degenerate = field.degenerate_count();
    if degenerate > 0 {
        tracing::debug!(
            "estimate_curvature: {} of {} vertices are degenerate",
            degenerate,
            field.len()
        );
    }
    field
}
