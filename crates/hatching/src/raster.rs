//! CPU direction raster - one rendered layer of the cross field

use glam::Vec2;

use crate::codec::{BACKGROUND_PIXEL, decode_direction};
use crate::types::{HatchingError, PixelMask};

/// A rendered direction layer
/// Stores pixels as [f32; 4]: RG direction, BA paint mask
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionRaster {
    /// Raster dimensions
    pub width: u32,
    pub height: u32,
    /// Pixel data in row-major order, row 0 first
    pixels: Vec<[f32; 4]>,
}

impl DirectionRaster {
    /// Create a raster of the given size, filled with background
    pub fn new(width: u32, height: u32) -> Result<Self, HatchingError> {
        Self::from_rgba_f32(
            width,
            height,
            vec![BACKGROUND_PIXEL; (width as usize) * (height as usize)],
        )
    }

    /// Wrap normalized RGBA pixels
    pub fn from_rgba_f32(
        width: u32,
        height: u32,
        pixels: Vec<[f32; 4]>,
    ) -> Result<Self, HatchingError> {
        if width == 0 || height == 0 {
            return Err(HatchingError::EmptyRaster);
        }
        let expected = (width as usize) * (height as usize);
        if pixels.len() != expected {
            return Err(HatchingError::BufferLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Convert tightly packed RGBA8 bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, HatchingError> {
        let expected = (width as usize) * (height as usize) * 4;
        if bytes.len() != expected {
            return Err(HatchingError::BufferLength {
                expected,
                actual: bytes.len(),
            });
        }
        let texels: &[[u8; 4]] = bytemuck::cast_slice(bytes);
        let pixels = texels
            .iter()
            .map(|texel| texel.map(|c| c as f32 / 255.0))
            .collect();
        Self::from_rgba_f32(width, height, pixels)
    }

    #[cfg(feature = "image")]
    pub fn from_rgba_image(image: &image::RgbaImage) -> Result<Self, HatchingError> {
        Self::from_rgba8(image.width(), image.height(), image.as_raw())
    }

    /// Build a raster by evaluating `pixel` at every integer coordinate
    pub fn from_fn(
        width: u32,
        height: u32,
        mut pixel: impl FnMut(u32, u32) -> [f32; 4],
    ) -> Result<Self, HatchingError> {
        let mut pixels = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                pixels.push(pixel(x, y));
            }
        }
        Self::from_rgba_f32(width, height, pixels)
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        Some(self.pixels[index])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [f32; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = (y as usize) * (self.width as usize) + (x as usize);
        self.pixels[index] = pixel;
    }

    /// Pixel containing a continuous raster position
    #[inline]
    pub fn sample(&self, position: Vec2) -> Option<[f32; 4]> {
        if !(position.x >= 0.0 && position.y >= 0.0) {
            return None;
        }
        self.get_pixel(position.x as u32, position.y as u32)
    }

    /// Inside the raster and accepted by the paint mask
    #[inline]
    pub fn is_valid(&self, position: Vec2, mask: &PixelMask) -> bool {
        self.sample(position).is_some_and(|p| mask.accepts(p))
    }

    /// Decoded direction at a position, None outside the raster or for a
    /// zero direction
    #[inline]
    pub fn direction(&self, position: Vec2) -> Option<Vec2> {
        let pixel = self.sample(position)?;
        let direction = decode_direction([pixel[0], pixel[1]]);
        (direction != Vec2::ZERO).then_some(direction)
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Raw pixel data as bytes (f32 RGBA)
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{direction_pixel, direction_pixel_u8};

    #[test]
    fn test_new_raster_is_background() {
        let raster = DirectionRaster::new(4, 3).unwrap();
        assert_eq!(raster.pixel_count(), 12);
        assert!(!raster.is_valid(Vec2::new(1.0, 1.0), &PixelMask::default()));
        assert!(matches!(
            DirectionRaster::new(0, 3),
            Err(HatchingError::EmptyRaster)
        ));
    }

    #[test]
    fn test_from_rgba8() {
        let bytes: Vec<u8> = (0..6).flat_map(|_| direction_pixel_u8(Vec2::Y)).collect();
        let raster = DirectionRaster::from_rgba8(3, 2, &bytes).unwrap();
        let d = raster.direction(Vec2::new(2.5, 1.5)).unwrap();
        assert!(d.distance(Vec2::Y) < 0.01);
        assert!(raster.is_valid(Vec2::new(0.0, 0.0), &PixelMask::default()));

        assert!(matches!(
            DirectionRaster::from_rgba8(3, 2, &bytes[..20]),
            Err(HatchingError::BufferLength {
                expected: 24,
                actual: 20
            })
        ));
    }

    #[cfg(feature = "image")]
    #[test]
    fn test_from_rgba_image() {
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba(direction_pixel_u8(Vec2::X)));
        let raster = DirectionRaster::from_rgba_image(&image).unwrap();
        assert_eq!(raster.dimensions(), (4, 2));
        assert!(raster.direction(Vec2::new(3.0, 1.0)).unwrap().distance(Vec2::X) < 0.01);
    }

    #[test]
    fn test_sample_bounds() {
        let mut raster = DirectionRaster::from_fn(10, 10, |_, _| direction_pixel(Vec2::X)).unwrap();
        raster.set_pixel(3, 4, BACKGROUND_PIXEL);
        let mask = PixelMask::default();

        assert!(raster.is_valid(Vec2::new(9.99, 0.0), &mask));
        assert!(!raster.is_valid(Vec2::new(10.0, 0.0), &mask));
        assert!(!raster.is_valid(Vec2::new(-0.5, 2.0), &mask));
        assert!(!raster.is_valid(Vec2::new(3.7, 4.2), &mask));
        assert_eq!(raster.direction(Vec2::new(3.7, 4.2)), None);
        assert_eq!(raster.as_bytes().len(), 10 * 10 * 16);
    }
}
