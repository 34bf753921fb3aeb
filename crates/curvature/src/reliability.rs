//! Reliability of principal directions from curvature anisotropy.

use crate::types::CurvatureField;

/// Anisotropy `||k2| - |k1|| / (|k2| + epsilon)`
///
/// Near 0 for umbilic points, where the principal directions are
/// arbitrary; near 1 where one curvature dominates.
#[inline]
pub fn curvature_ratio(k1: f32, k2: f32, epsilon: f32) -> f32 {
    (k2.abs() - k1.abs()).abs() / (k2.abs() + epsilon)
}

/// Per-vertex trust flags; reliable directions stay fixed while smoothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReliabilityMask {
    reliable: Vec<bool>,
}

impl ReliabilityMask {
    /// A vertex is reliable when it was estimated and its ratio reaches
    /// `threshold`
    pub fn from_field(field: &CurvatureField, threshold: f32) -> Self {
        let reliable = field
            .samples
            .iter()
            .map(|s| s.is_estimated() && s.ratio >= threshold)
            .collect();
        Self { reliable }
    }

    #[inline]
    pub fn is_reliable(&self, vertex: usize) -> bool {
        self.reliable.get(vertex).copied().unwrap_or(false)
    }

    pub fn reliable_count(&self) -> usize {
        self.reliable.iter().filter(|r| **r).count()
    }

    pub fn len(&self) -> usize {
        self.reliable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reliable.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.reliable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurvatureSample, FourfoldDirections, VertexStatus};
    use glam::Vec3;

    fn sample(ratio: f32, status: VertexStatus) -> CurvatureSample {
        CurvatureSample {
            k1: 0.0,
            k2: 1.0,
            minor_direction: Vec3::X,
            major_direction: Vec3::Y,
            normal: Vec3::Z,
            directions: FourfoldDirections::from_base(Vec3::X, Vec3::Z).unwrap(),
            ratio,
            status,
            open_ring: false,
        }
    }

    #[test]
    fn test_ratio() {
        assert!((curvature_ratio(0.0, 2.0, 0.0) - 1.0).abs() < 1e-6);
        assert!(curvature_ratio(1.0, -1.0, 1e-6).abs() < 1e-6);
        // Flat: both zero stays finite
        assert_eq!(curvature_ratio(0.0, 0.0, 1e-6), 0.0);
        assert!((curvature_ratio(-0.5, 1.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mask_threshold_is_inclusive() {
        let field = CurvatureField {
            samples: vec![
                sample(0.9, VertexStatus::Estimated),
                sample(0.5, VertexStatus::Estimated),
                sample(0.85, VertexStatus::Estimated),
                sample(1.0, VertexStatus::Degenerate),
            ],
        };
        let mask = ReliabilityMask::from_field(&field, 0.85);

        assert!(mask.is_reliable(0));
        assert!(!mask.is_reliable(1));
        assert!(mask.is_reliable(2), "ratio equal to the threshold is reliable");
        assert!(!mask.is_reliable(3), "degenerate vertices are never reliable");
        assert!(!mask.is_reliable(42));
        assert_eq!(mask.len(), 4);
        assert_eq!(mask.reliable_count(), 2);
    }
}
