//! Direction arrays: rotation about normals and vertex-color encodings.

use glam::{Quat, Vec3, Vec4};

use crate::types::{CurvatureError, CurvatureField, check_len};

/// Rotate each direction about its vertex normal by `degrees`
///
/// Directions with a zero-length normal are left unchanged.
pub fn rotate_about_normals(
    directions: &[Vec3],
    normals: &[Vec3],
    degrees: f32,
) -> Result<Vec<Vec3>, CurvatureError> {
    check_len("normals", directions.len(), normals.len())?;
    let angle = degrees.to_radians();
    Ok(directions
        .iter()
        .zip(normals)
        .map(|(&d, &n)| match n.try_normalize() {
            Some(axis) => Quat::from_axis_angle(axis, angle) * d,
            None => d,
        })
        .collect())
}

/// Base directions of `field` rotated by `degrees` about the fitted normals
///
/// `0`, `90`, `180` and `270` give the four rendered layers of the cross
/// field; other angles produce tilted hatching.
pub fn direction_layer(field: &CurvatureField, degrees: f32) -> Vec<Vec3> {
    let angle = degrees.to_radians();
    field
        .samples
        .iter()
        .map(|s| s.directions.rotated(s.normal, angle).base())
        .collect()
}

/// Encode a unit direction as an RGBA color, `(d + 1) / 2` with opaque alpha
#[inline]
pub fn encode_direction_color(direction: Vec3) -> Vec4 {
    ((direction + Vec3::ONE) * 0.5).extend(1.0)
}

/// Inverse of [`encode_direction_color`]; returns zero for a zero color
#[inline]
pub fn decode_direction_color(color: Vec4) -> Vec3 {
    (color.truncate() * 2.0 - Vec3::ONE).normalize_or_zero()
}

/// Vertex colors for a direction array
pub fn direction_colors(directions: &[Vec3]) -> Vec<Vec4> {
    directions.iter().map(|&d| encode_direction_color(d)).collect()
}

/// Red-channel visualization of curvature anisotropy
///
/// Near-umbilic vertices (low ratio, free during smoothing) are bright red;
/// strongly anisotropic vertices are black.
pub fn ratio_colors(field: &CurvatureField) -> Vec<Vec4> {
    field
        .samples
        .iter()
        .map(|s| Vec4::new((1.0 - s.ratio).clamp(0.0, 1.0), 0.0, 0.0, 1.0))
        .collect()
}
