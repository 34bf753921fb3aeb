use glam::Vec2;
use serde::{Deserialize, Serialize};

use crosshatch_config::ConfigError;

/// Errors raised while building rasters or tracing lines
#[derive(Debug, thiserror::Error)]
pub enum HatchingError {
    #[error("Raster has zero width or height")]
    EmptyRaster,
    #[error("Pixel buffer holds {actual} values, expected {expected}")]
    BufferLength { expected: usize, actual: usize },
    #[error("A direction field needs 1, 2 or 4 layers, got {0}")]
    LayerCount(usize),
    #[error("Layer {layer} is {actual:?}, expected {expected:?}")]
    LayerMismatch {
        layer: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Invalid hatching configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Exceeded the maximum of {limit} hatch lines")]
    LineLimitExceeded { limit: usize },
}

/// A traced streamline in raster pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatchLine {
    pub points: Vec<Vec2>,
    /// Unit direction at each point, oriented along the polyline
    pub directions: Vec<Vec2>,
    /// Tracing pass that produced the line (0 for the first hatching layer)
    pub pass: u32,
}

impl HatchLine {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline arc length in pixels
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Pixel validity thresholds for the mask channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelMask {
    /// Alpha above this marks the pixel unpaintable
    pub mask_level: f32,
    /// Blue above this marks background
    pub background_blue: f32,
}

impl PixelMask {
    #[inline]
    pub fn accepts(&self, pixel: [f32; 4]) -> bool {
        pixel[3] <= self.mask_level && pixel[2] <= self.background_blue
    }
}

impl Default for PixelMask {
    fn default() -> Self {
        Self {
            mask_level: crosshatch_config::DEFAULT_MASK_LEVEL,
            background_blue: crosshatch_config::DEFAULT_BACKGROUND_BLUE,
        }
    }
}
