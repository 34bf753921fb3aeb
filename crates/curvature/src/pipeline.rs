//! Mesh to cross field pipeline
//!
//! Connects the stages that turn a renderable mesh into per-vertex hatching
//! directions:
//! 1. Coincident vertices are welded so one-rings are not cut at seams
//! 2. One-rings are walked once on the welded mesh
//! 3. Curvature is estimated per welded vertex
//! 4. The cross field is smoothed (energy pass, then flood fill)
//! 5. Results are scattered back onto the source vertices
//!
//! The pipeline owns no mesh state between runs.

use tracing::{debug, info};

use crosshatch_config::{CurvatureConfig, SmoothingConfig};
use topology::{CornerTable, TriangleMesh, WeldedMesh, one_rings};

use crate::crossfield::{FieldSmoothingContext, SmoothingReport, smooth_with_context};
use crate::estimator::estimate_with_rings;
use crate::types::{CurvatureError, CurvatureField};

/// Output of [`CurvaturePipeline::run`]
#[derive(Debug, Clone)]
pub struct CrossFieldResult {
    /// Smoothed field, one sample per source vertex
    pub field: CurvatureField,
    /// Smoothed field on the welded mesh
    pub welded_field: CurvatureField,
    /// Welded mesh with its source mapping
    pub welded: WeldedMesh,
    pub report: SmoothingReport,
}

/// Curvature estimation followed by cross-field smoothing
#[derive(Debug, Clone, Default)]
pub struct CurvaturePipeline {
    curvature: CurvatureConfig,
    smoothing: SmoothingConfig,
}

impl CurvaturePipeline {
    pub fn new(curvature: CurvatureConfig, smoothing: SmoothingConfig) -> Self {
        Self {
            curvature,
            smoothing,
        }
    }

    pub fn curvature_config(&self) -> &CurvatureConfig {
        &self.curvature
    }

    pub fn smoothing_config(&self) -> &SmoothingConfig {
        &self.smoothing
    }

    /// Run every stage on `mesh`
    pub fn run(&self, mesh: &TriangleMesh) -> Result<CrossFieldResult, CurvatureError> {
        self.curvature.validate()?;
        self.smoothing.validate()?;

        let welded = WeldedMesh::weld(mesh, self.curvature.weld_precision);
        let table = CornerTable::build(welded.mesh.indices());
        let rings = one_rings(&welded.mesh, &table);
        let open = rings
            .iter()
            .filter(|ring| ring.as_ref().is_some_and(|r| !r.closed))
            .count();
        debug!(
            "CurvaturePipeline: {} welded vertices, {} boundary corners, {} open one-rings",
            welded.mesh.vertex_count(),
            table.boundary_count(),
            open
        );

        let mut field = estimate_with_rings(&welded.mesh, &rings, &self.curvature)?;
        info!(
            "CurvaturePipeline: estimated curvature at {} vertices ({} degenerate)",
            field.len(),
            field.degenerate_count()
        );

        let context = FieldSmoothingContext::with_rings(
            &welded.mesh,
            &rings,
            &field,
            self.smoothing.reliability_threshold,
        )?;
        let report = smooth_with_context(&context, &mut field, &self.smoothing)?;
        info!(
            "CurvaturePipeline: smoothed cross field ({} reliable, {} free)",
            report.reliable_vertices, report.free_variables
        );

        let source = CurvatureField {
            samples: welded.scatter(&field.samples),
        };
        Ok(CrossFieldResult {
            field: source,
            welded_field: field,
            welded,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology::fixtures;

    #[test]
    fn test_split_corners_match_welded_estimate() {
        let sphere = fixtures::icosphere(2, 1.5);
        let split = sphere.split_corners();
        assert_eq!(split.vertex_count(), split.corner_count());

        let result = CurvaturePipeline::default().run(&split).unwrap();
        assert_eq!(result.welded.mesh.vertex_count(), sphere.vertex_count());
        assert_eq!(result.field.len(), split.vertex_count());

        // Every corner of a welded vertex sees the same sample
        for (corner, sample) in result.field.samples.iter().enumerate() {
            let merged = result.welded.merged_index(corner).unwrap();
            assert_eq!(*sample, result.welded_field.samples[merged]);
            assert!(sample.is_estimated());
            assert!(sample.k1.abs() <= sample.k2.abs());
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let pipeline = CurvaturePipeline::new(
            CurvatureConfig {
                min_ring_size: 1,
                ..CurvatureConfig::default()
            },
            SmoothingConfig::default(),
        );
        let mesh = fixtures::flat_grid(2, 1.0);
        assert!(matches!(pipeline.run(&mesh), Err(CurvatureError::Config(_))));
    }

    #[test]
    fn test_flat_grid_is_fully_free() {
        let mesh = fixtures::flat_grid(4, 1.0);
        let result = CurvaturePipeline::default().run(&mesh).unwrap();
        assert_eq!(result.report.reliable_vertices, 0);
        let optimizer = result.report.optimizer.unwrap();
        assert!(optimizer.final_energy <= optimizer.initial_energy);
    }
}
