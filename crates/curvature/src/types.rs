//! Curvature samples, four-fold direction sets and errors.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crosshatch_config::ConfigError;
use topology::TopologyError;

/// Errors raised by the curvature pipeline
#[derive(Debug, thiserror::Error)]
pub enum CurvatureError {
    #[error("Invalid mesh: {0}")]
    Topology(#[from] TopologyError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Expected {expected} {what}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), CurvatureError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CurvatureError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Outcome of the per-vertex estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexStatus {
    /// Patch fit and shape operator succeeded
    Estimated,
    /// Too few neighbors, zero-length offsets or a singular fit
    Degenerate,
}

/// Four directions related by quarter turns about a normal
///
/// `self.0[k]` is `self.0[0]` rotated by `k * 90` degrees, and
/// `cross(d0, d1)` points along the normal the set was built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourfoldDirections(pub [Vec3; 4]);

impl FourfoldDirections {
    pub const ZERO: Self = Self([Vec3::ZERO; 4]);

    /// Build the set from a base direction projected into the tangent plane
    ///
    /// Returns `None` when the base direction is parallel to the normal or
    /// either vector has zero length.
    pub fn from_base(base: Vec3, normal: Vec3) -> Option<Self> {
        let normal = normal.try_normalize()?;
        let d0 = (base - normal * base.dot(normal)).try_normalize()?;
        let d1 = normal.cross(d0);
        Some(Self([d0, d1, -d0, -d1]))
    }

    #[inline]
    pub fn base(&self) -> Vec3 {
        self.0[0]
    }

    /// Representative `k` quarter turns away from the base (wraps modulo 4)
    #[inline]
    pub fn get(&self, k: usize) -> Vec3 {
        self.0[k % 4]
    }

    /// Relabel so that the former entry `k` becomes the base
    pub fn cycled(&self, k: usize) -> Self {
        Self(std::array::from_fn(|i| self.0[(i + k) % 4]))
    }

    /// Rotate every member by `angle` radians about `normal`
    pub fn rotated(&self, normal: Vec3, angle: f32) -> Self {
        match normal.try_normalize() {
            Some(axis) => {
                let rotation = Quat::from_axis_angle(axis, angle);
                Self(self.0.map(|d| rotation * d))
            }
            None => *self,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0[0] == Vec3::ZERO
    }
}

/// Curvature estimate at one vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvatureSample {
    /// Minor principal curvature (`|k1| <= |k2|`)
    pub k1: f32,
    /// Major principal curvature
    pub k2: f32,
    /// Principal direction of `k1`, back-projected to 3D
    pub minor_direction: Vec3,
    /// Principal direction of `k2`, back-projected to 3D
    pub major_direction: Vec3,
    /// Normal of the fitted patch (input normal for degenerate vertices)
    pub normal: Vec3,
    /// Cross-field representatives around `normal`, based on the minor direction
    pub directions: FourfoldDirections,
    /// Anisotropy `||k2| - |k1|| / (|k2| + eps)`
    pub ratio: f32,
    pub status: VertexStatus,
    /// The vertex fan hit a mesh boundary
    pub open_ring: bool,
}

impl CurvatureSample {
    /// Sentinel for vertices that could not be estimated
    pub fn degenerate(normal: Vec3) -> Self {
        Self {
            k1: 0.0,
            k2: 0.0,
            minor_direction: Vec3::ZERO,
            major_direction: Vec3::ZERO,
            normal,
            directions: FourfoldDirections::ZERO,
            ratio: 0.0,
            status: VertexStatus::Degenerate,
            open_ring: false,
        }
    }

    #[inline]
    pub fn is_estimated(&self) -> bool {
        self.status == VertexStatus::Estimated
    }
}

/// Per-vertex curvature estimates for one mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurvatureField {
    pub samples: Vec<CurvatureSample>,
}

impl CurvatureField {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn degenerate_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_estimated()).count()
    }

    /// Base cross-field direction of every vertex
    pub fn base_directions(&self) -> Vec<Vec3> {
        self.samples.iter().map(|s| s.directions.base()).collect()
    }

    pub fn normals(&self) -> Vec<Vec3> {
        self.samples.iter().map(|s| s.normal).collect()
    }

    pub fn ratios(&self) -> Vec<f32> {
        self.samples.iter().map(|s| s.ratio).collect()
    }
}
