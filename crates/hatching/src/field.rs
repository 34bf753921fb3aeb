//! Multi-layer direction field with four-fold disambiguation

use glam::Vec2;

use crate::raster::DirectionRaster;
use crate::types::{HatchingError, PixelMask};

/// Rendered layers of a cross field
///
/// Layers hold the field rotated by 0, 90, 180 and 270 degrees. With one
/// layer the 90 degree layer is synthesized by rotating the decoded
/// direction; with two layers the 180/270 degree layers are their negations.
/// Only layer 0 is consulted for the paint mask.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionField {
    layers: Vec<DirectionRaster>,
    /// Single-layer fields track the quarter turn instead of swapping layers
    turned: bool,
}

impl DirectionField {
    pub fn new(layers: Vec<DirectionRaster>) -> Result<Self, HatchingError> {
        if !matches!(layers.len(), 1 | 2 | 4) {
            return Err(HatchingError::LayerCount(layers.len()));
        }
        let expected = layers[0].dimensions();
        for (layer, raster) in layers.iter().enumerate().skip(1) {
            if raster.dimensions() != expected {
                return Err(HatchingError::LayerMismatch {
                    layer,
                    expected,
                    actual: raster.dimensions(),
                });
            }
        }
        Ok(Self {
            layers,
            turned: false,
        })
    }

    pub fn single(raster: DirectionRaster) -> Self {
        Self {
            layers: vec![raster],
            turned: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.layers[0].width
    }

    pub fn height(&self) -> u32 {
        self.layers[0].height
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn mask_layer(&self) -> &DirectionRaster {
        &self.layers[0]
    }

    /// Rotate the field by 90 degrees
    ///
    /// Rendered layers swap 0 with 90 and 180 with 270; a single layer is
    /// rotated on decode.
    pub fn quarter_turn(&mut self) {
        match self.layers.len() {
            1 => self.turned = !self.turned,
            _ => {
                for pair in self.layers.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
            }
        }
    }

    #[inline]
    pub fn is_valid(&self, position: Vec2, mask: &PixelMask) -> bool {
        self.layers[0].is_valid(position, mask)
    }

    /// Direction of the 0 degree layer
    pub fn primary(&self, position: Vec2) -> Option<Vec2> {
        let direction = self.layers[0].direction(position)?;
        Some(if self.turned { direction.perp() } else { direction })
    }

    /// Readable directions at a position, before sign ambiguity
    fn layer_directions(&self, position: Vec2) -> [Option<Vec2>; 4] {
        match self.layers.len() {
            1 => {
                let d = self.primary(position);
                [d, d.map(Vec2::perp), None, None]
            }
            _ => {
                let mut out = [None; 4];
                for (slot, layer) in out.iter_mut().zip(&self.layers) {
                    *slot = layer.direction(position);
                }
                out
            }
        }
    }

    /// Pick the field direction at `position` closest to `reference`
    ///
    /// Every readable layer direction and its negation is a candidate. The
    /// best candidate is returned when its dot product with the normalized
    /// reference is at least `tolerance`.
    pub fn resolve_direction(&self, position: Vec2, reference: Vec2, tolerance: f32) -> Option<Vec2> {
        let reference = reference.try_normalize()?;
        let mut best: Option<(f32, Vec2)> = None;
        for direction in self.layer_directions(position).into_iter().flatten() {
            for candidate in [direction, -direction] {
                let dot = candidate.dot(reference);
                if best.is_none_or(|(score, _)| dot > score) {
                    best = Some((dot, candidate));
                }
            }
        }
        best.and_then(|(score, candidate)| (score >= tolerance).then_some(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::direction_pixel;

    fn uniform(direction: Vec2) -> DirectionRaster {
        DirectionRaster::from_fn(8, 8, |_, _| direction_pixel(direction)).unwrap()
    }

    #[test]
    fn test_resolve_picks_closest_representative() {
        let field = DirectionField::single(uniform(Vec2::X));
        let p = Vec2::new(4.0, 4.0);

        let d = field.resolve_direction(p, Vec2::new(-1.0, 0.1), 0.95).unwrap();
        assert!(d.distance(Vec2::NEG_X) < 1e-6);
        let d = field.resolve_direction(p, Vec2::new(0.05, 1.0), 0.95).unwrap();
        assert!(d.distance(Vec2::Y) < 1e-6);
        // 45 degrees off every representative
        assert_eq!(field.resolve_direction(p, Vec2::ONE, 0.95), None);
        assert!(field.resolve_direction(p, Vec2::ONE, 0.7).is_some());
        assert_eq!(field.resolve_direction(Vec2::new(20.0, 1.0), Vec2::X, 0.0), None);
    }

    #[test]
    fn test_quarter_turn_single_layer() {
        let mut field = DirectionField::single(uniform(Vec2::X));
        field.quarter_turn();
        let d = field.primary(Vec2::new(1.0, 1.0)).unwrap();
        assert!(d.distance(Vec2::Y) < 1e-6);
        field.quarter_turn();
        assert!(field.primary(Vec2::new(1.0, 1.0)).unwrap().distance(Vec2::X) < 1e-6);
    }

    #[test]
    fn test_quarter_turn_swaps_layers() {
        let mut field = DirectionField::new(vec![uniform(Vec2::X), uniform(Vec2::Y)]).unwrap();
        field.quarter_turn();
        assert!(field.primary(Vec2::ZERO).unwrap().distance(Vec2::Y) < 1e-6);
    }

    #[test]
    fn test_layer_validation() {
        assert!(matches!(
            DirectionField::new(vec![uniform(Vec2::X); 3]),
            Err(HatchingError::LayerCount(3))
        ));
        let small = DirectionRaster::new(4, 4).unwrap();
        assert!(matches!(
            DirectionField::new(vec![uniform(Vec2::X), small]),
            Err(HatchingError::LayerMismatch { layer: 1, .. })
        ));
    }
}
