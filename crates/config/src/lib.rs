//! Shared configuration for the cross-hatching pipeline
//!
//! This crate provides the single source of truth for every tunable used by
//! the curvature estimator, the cross-field smoother and the hatching tracer.
//! Values are configurable and should not be treated as magic numbers.

use serde::{Deserialize, Serialize};

// ============================================================================
// Curvature defaults
// ============================================================================

/// Added to |k2| when computing the anisotropy ratio
pub const DEFAULT_RATIO_EPSILON: f32 = 1e-6;

/// Quantization scale used to weld coincident vertices (1 / tolerance)
pub const DEFAULT_WELD_PRECISION: f32 = 1_000_000.0;

/// Fewest one-ring neighbors a vertex needs for a patch fit
pub const DEFAULT_MIN_RING_SIZE: usize = 3;

// ============================================================================
// Smoothing defaults
// ============================================================================

/// Vertices whose curvature ratio reaches this value are frozen
pub const DEFAULT_RELIABILITY_THRESHOLD: f32 = 0.85;

/// Number of correction pairs kept by L-BFGS
pub const DEFAULT_LBFGS_MEMORY: usize = 5;

/// Iteration cap for L-BFGS
pub const DEFAULT_LBFGS_MAX_ITERATIONS: usize = 200;

// ============================================================================
// Hatching defaults
// ============================================================================

/// Line separation as a fraction of the raster width
pub const DEFAULT_D_SEPARATION: f32 = 0.01;

/// Test distance as a fraction of the separation distance
pub const DEFAULT_D_TEST: f32 = 0.5;

/// Lower bound for the separation distance in pixels
pub const MIN_SEPARATION_PX: f32 = 5.0;

/// Lower bound for the test distance in pixels
pub const MIN_TEST_PX: f32 = 3.0;

/// Step of the coarse seed scan in pixels
pub const DEFAULT_SEED_GRID_STEP: u32 = 50;

/// Tracing aborts when more lines than this would be committed
pub const DEFAULT_MAX_LINES: usize = 1500;

/// Step cap for each branch of a line
pub const DEFAULT_MAX_STEPS_PER_BRANCH: usize = 1000;

/// Lines with fewer points are discarded
pub const DEFAULT_MIN_LINE_POINTS: usize = 3;

/// Minimum cosine between successive directions while growing a line
pub const DEFAULT_CONTINUE_TOLERANCE: f32 = 0.95;

/// Minimum cosine between a propagated seed and its source direction
pub const DEFAULT_SEED_TOLERANCE: f32 = 0.8;

/// Points of another pass only conflict above this |cosine|
pub const DEFAULT_CROSSING_COS: f32 = 0.5;

/// Pixels with alpha above this level are outside the paintable area
pub const DEFAULT_MASK_LEVEL: f32 = 1.0;

/// Pixels with blue above this level are background
pub const DEFAULT_BACKGROUND_BLUE: f32 = 0.9;

/// Bisection steps used to find the last valid sub-point of a step
pub const DEFAULT_REFINE_ITERATIONS: usize = 8;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Parameters of the per-vertex curvature estimator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurvatureConfig {
    /// Epsilon in `||k2| - |k1|| / (|k2| + eps)` (default: 1e-6)
    pub ratio_epsilon: f32,
    /// Position quantization scale for welding (default: 1e6)
    pub weld_precision: f32,
    /// Minimum neighbors for a patch fit (default: 3)
    pub min_ring_size: usize,
}

impl Default for CurvatureConfig {
    fn default() -> Self {
        Self {
            ratio_epsilon: DEFAULT_RATIO_EPSILON,
            weld_precision: DEFAULT_WELD_PRECISION,
            min_ring_size: DEFAULT_MIN_RING_SIZE,
        }
    }
}

/// Order in which the flood fill visits triangles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FloodMode {
    /// Grow from a seed triangle through vertex adjacency
    #[default]
    Connected,
    /// Visit triangles in index order
    Raster,
}

/// Which vertices the smoothing energy treats as free
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EnergyVariant {
    /// Only unreliable vertices rotate; reliable ones are fixed
    #[default]
    Masked,
    /// Every estimated vertex rotates
    Unmasked,
}

/// Stopping rules and line search constants for L-BFGS
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LbfgsConfig {
    /// Stored correction pairs (default: 5)
    pub memory: usize,
    /// Iteration cap (default: 200)
    pub max_iterations: usize,
    /// Stop when the gradient's infinity norm drops below this
    pub gradient_tolerance: f64,
    /// Stop when the relative energy change drops below this
    pub function_tolerance: f64,
    /// Backtracking steps per line search
    pub max_line_search_steps: usize,
    /// Sufficient decrease constant
    pub armijo: f64,
    /// Step shrink factor
    pub backtrack: f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            memory: DEFAULT_LBFGS_MEMORY,
            max_iterations: DEFAULT_LBFGS_MAX_ITERATIONS,
            gradient_tolerance: 1e-6,
            function_tolerance: 1e-10,
            max_line_search_steps: 30,
            armijo: 1e-4,
            backtrack: 0.5,
        }
    }
}

/// Parameters of the cross-field smoother
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Ratio at or above which a vertex is reliable (default: 0.85)
    pub reliability_threshold: f32,
    /// Run the global energy minimization
    pub energy_smoothing: bool,
    /// Free variables of the energy
    pub energy_variant: EnergyVariant,
    /// Run the greedy consistency flood fill afterwards
    pub flood_fill: bool,
    /// Triangle visiting order for the flood fill
    pub flood_mode: FloodMode,
    /// Only allow 0 and 180 degree flips in the flood fill
    pub sign_only: bool,
    pub lbfgs: LbfgsConfig,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            reliability_threshold: DEFAULT_RELIABILITY_THRESHOLD,
            energy_smoothing: true,
            energy_variant: EnergyVariant::Masked,
            flood_fill: true,
            flood_mode: FloodMode::Connected,
            sign_only: false,
            lbfgs: LbfgsConfig::default(),
        }
    }
}

/// Parameters of the streamline tracer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HatchingConfig {
    /// Separation as a fraction of the raster width (default: 0.01)
    pub d_separation: f32,
    /// Test distance as a fraction of the separation (default: 0.5)
    pub d_test: f32,
    /// Separation floor in pixels (default: 5)
    pub min_separation_px: f32,
    /// Test distance floor in pixels (default: 3)
    pub min_test_px: f32,
    /// Coarse seed scan step in pixels (default: 50)
    pub seed_grid_step: u32,
    /// Fatal line cap (default: 1500)
    pub max_lines: usize,
    /// Steps per branch (default: 1000)
    pub max_steps_per_branch: usize,
    /// Fewest points a kept line may have (default: 3)
    pub min_line_points: usize,
    /// Cosine band while growing (default: 0.95)
    pub continue_tolerance: f32,
    /// Cosine band for propagated seeds (default: 0.8)
    pub seed_tolerance: f32,
    /// |cos| above which points of another pass conflict (default: 0.5)
    pub crossing_cos: f32,
    /// Alpha validity level (default: 1.0)
    pub mask_level: f32,
    /// Blue background level (default: 0.9)
    pub background_blue: f32,
    /// Bisection steps for the last valid sub-point (default: 8)
    pub refine_iterations: usize,
}

impl Default for HatchingConfig {
    fn default() -> Self {
        Self {
            d_separation: DEFAULT_D_SEPARATION,
            d_test: DEFAULT_D_TEST,
            min_separation_px: MIN_SEPARATION_PX,
            min_test_px: MIN_TEST_PX,
            seed_grid_step: DEFAULT_SEED_GRID_STEP,
            max_lines: DEFAULT_MAX_LINES,
            max_steps_per_branch: DEFAULT_MAX_STEPS_PER_BRANCH,
            min_line_points: DEFAULT_MIN_LINE_POINTS,
            continue_tolerance: DEFAULT_CONTINUE_TOLERANCE,
            seed_tolerance: DEFAULT_SEED_TOLERANCE,
            crossing_cos: DEFAULT_CROSSING_COS,
            mask_level: DEFAULT_MASK_LEVEL,
            background_blue: DEFAULT_BACKGROUND_BLUE,
            refine_iterations: DEFAULT_REFINE_ITERATIONS,
        }
    }
}

impl CurvatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ratio_epsilon >= 0.0) {
            return Err(invalid("curvature.ratio_epsilon", "must not be negative"));
        }
        if !(self.weld_precision > 0.0) {
            return Err(invalid("curvature.weld_precision", "must be positive"));
        }
        if self.min_ring_size < 3 {
            return Err(invalid("curvature.min_ring_size", "must be at least 3"));
        }
        Ok(())
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reliability_threshold) {
            return Err(invalid(
                "smoothing.reliability_threshold",
                "must lie in [0, 1]",
            ));
        }
        if self.lbfgs.memory == 0 {
            return Err(invalid("smoothing.lbfgs.memory", "must be at least 1"));
        }
        let backtrack = self.lbfgs.backtrack;
        if !(backtrack > 0.0 && backtrack < 1.0) {
            return Err(invalid("smoothing.lbfgs.backtrack", "must lie in (0, 1)"));
        }
        Ok(())
    }
}

impl HatchingConfig {
    /// Separation distance in whole pixels for a raster of the given width
    pub fn separation_px(&self, width: u32) -> f32 {
        (self.d_separation * width as f32)
            .floor()
            .max(self.min_separation_px)
    }

    /// Test distance in whole pixels for a raster of the given width
    pub fn test_px(&self, width: u32) -> f32 {
        (self.d_test * self.separation_px(width))
            .floor()
            .max(self.min_test_px)
    }

    /// Check the value ranges the tracer relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.d_separation > 0.0) {
            return Err(invalid("d_separation", "must be positive"));
        }
        if !(self.d_test > 0.0) {
            return Err(invalid("d_test", "must be positive"));
        }
        // Pixel distances below one pixel let a branch stall in place
        if !(self.min_separation_px >= 1.0) {
            return Err(invalid("min_separation_px", "must be at least 1"));
        }
        if !(self.min_test_px >= 1.0) {
            return Err(invalid("min_test_px", "must be at least 1"));
        }
        if self.seed_grid_step == 0 {
            return Err(invalid("seed_grid_step", "must be at least 1"));
        }
        if self.max_steps_per_branch == 0 {
            return Err(invalid("max_steps_per_branch", "must be at least 1"));
        }
        if self.min_line_points < 2 {
            return Err(invalid("min_line_points", "must be at least 2"));
        }
        for (field, value) in [
            ("continue_tolerance", self.continue_tolerance),
            ("seed_tolerance", self.seed_tolerance),
            ("crossing_cos", self.crossing_cos),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("{value} is not a cosine")));
            }
        }
        Ok(())
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrosshatchConfig {
    pub curvature: CurvatureConfig,
    pub smoothing: SmoothingConfig,
    pub hatching: HatchingConfig,
}

impl CrosshatchConfig {
    /// Parse a JSON document; missing fields fall back to defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.curvature.validate()?;
        self.smoothing.validate()?;
        self.hatching.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrosshatchConfig::default();
        assert_eq!(config.hatching.max_lines, DEFAULT_MAX_LINES);
        assert_eq!(
            config.smoothing.reliability_threshold,
            DEFAULT_RELIABILITY_THRESHOLD
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pixel_distances() {
        let config = HatchingConfig::default();
        // 1% of 1000 px
        assert_eq!(config.separation_px(1000), 10.0);
        assert_eq!(config.test_px(1000), 5.0);
        // Small rasters hit the floors
        assert_eq!(config.separation_px(100), MIN_SEPARATION_PX);
        assert_eq!(config.test_px(100), MIN_TEST_PX);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CrosshatchConfig::from_json_str(
            r#"{ "hatching": { "d_separation": 0.02 }, "smoothing": { "flood_mode": "raster" } }"#,
        )
        .unwrap();
        assert_eq!(config.hatching.d_separation, 0.02);
        assert_eq!(config.hatching.d_test, DEFAULT_D_TEST);
        assert_eq!(config.smoothing.flood_mode, FloodMode::Raster);
        assert_eq!(config.curvature, CurvatureConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CrosshatchConfig::from_json_str(r#"{ "hatching": { "seed_tolerance": 2.0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "seed_tolerance",
                ..
            }
        ));

        let stalled = HatchingConfig {
            d_separation: 0.001,
            min_separation_px: 0.0,
            min_test_px: 0.0,
            ..HatchingConfig::default()
        };
        assert_eq!(stalled.separation_px(100), 0.0);
        assert!(matches!(
            stalled.validate(),
            Err(ConfigError::Invalid {
                field: "min_separation_px",
                ..
            })
        ));
        let err = HatchingConfig {
            min_test_px: 0.5,
            ..HatchingConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "min_test_px", .. }));
        let err = HatchingConfig {
            max_steps_per_branch: 0,
            ..HatchingConfig::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "max_steps_per_branch",
                ..
            }
        ));

        let err = CrosshatchConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
