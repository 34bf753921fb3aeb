//! RG direction encoding used by rendered direction textures
//!
//! A 2D unit direction `d` is stored as `(d + 1) / 2` in the red and green
//! channels; blue and alpha carry the paint mask.

use glam::Vec2;

/// Pixel used outside the paintable region (blue marks background)
pub const BACKGROUND_PIXEL: [f32; 4] = [0.5, 0.5, 1.0, 1.0];

/// Encode a direction into normalized `[r, g]`
#[inline]
pub fn encode_direction(direction: Vec2) -> [f32; 2] {
    let rg = (direction + Vec2::ONE) * 0.5;
    [rg.x, rg.y]
}

/// Decode normalized `[r, g]` into a unit direction, zero if undefined
#[inline]
pub fn decode_direction(rg: [f32; 2]) -> Vec2 {
    (Vec2::new(rg[0], rg[1]) * 2.0 - Vec2::ONE).normalize_or_zero()
}

/// Encode a direction into 8-bit `[r, g]`
#[inline]
pub fn encode_direction_u8(direction: Vec2) -> [u8; 2] {
    encode_direction(direction).map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[inline]
pub fn decode_direction_u8(rg: [u8; 2]) -> Vec2 {
    decode_direction(rg.map(|c| c as f32 / 255.0))
}

/// Paintable pixel carrying `direction`
#[inline]
pub fn direction_pixel(direction: Vec2) -> [f32; 4] {
    let [r, g] = encode_direction(direction);
    [r, g, 0.0, 1.0]
}

/// 8-bit paintable pixel carrying `direction`
#[inline]
pub fn direction_pixel_u8(direction: Vec2) -> [u8; 4] {
    let [r, g] = encode_direction_u8(direction);
    [r, g, 0, 255]
}
