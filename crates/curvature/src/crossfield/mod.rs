//! Cross-field smoothing
//!
//! Turns the raw per-vertex principal directions into a four-fold symmetric
//! field that varies smoothly over the surface:
//! - [`energy`] - periodic smoothness energy over per-vertex rotation angles,
//!   minimized with [`crate::lbfgs`]
//! - [`flood_fill`] - greedy relabeling of the four representatives so that
//!   neighboring base directions agree
//!
//! All per-mesh state lives in a [`FieldSmoothingContext`], so independent
//! meshes can be smoothed concurrently.

pub mod energy;
pub mod flood_fill;

use serde::{Deserialize, Serialize};

use crosshatch_config::{EnergyVariant, FloodMode, LbfgsConfig, SmoothingConfig};
use topology::{CornerTable, OneRing, TriangleMesh, VertexTriangles, one_rings};

use crate::lbfgs::{Lbfgs, LbfgsReport};
use crate::reliability::ReliabilityMask;
use crate::types::{CurvatureError, CurvatureField, check_len};

use energy::{EnergyInputs, MaskedEnergy, SmoothingEnergy, UnmaskedEnergy};
use flood_fill::FloodFillReport;

/// Outcome of [`smooth_cross_field`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingReport {
    pub reliable_vertices: usize,
    /// Angles optimized by the energy pass (0 when it did not run)
    pub free_variables: usize,
    pub optimizer: Option<LbfgsReport>,
    pub flood_fill: Option<FloodFillReport>,
}

/// Connectivity and reliability of one mesh, shared by both smoothing passes
pub struct FieldSmoothingContext<'a> {
    mesh: &'a TriangleMesh,
    neighbors: Vec<Vec<usize>>,
    adjacency: VertexTriangles,
    mask: ReliabilityMask,
}

impl<'a> FieldSmoothingContext<'a> {
    pub fn new(
        mesh: &'a TriangleMesh,
        field: &CurvatureField,
        reliability_threshold: f32,
    ) -> Result<Self, CurvatureError> {
        let table = CornerTable::build(mesh.indices());
        let rings = one_rings(mesh, &table);
        Self::with_rings(mesh, &rings, field, reliability_threshold)
    }

    /// Build from one-rings the caller already has
    pub fn with_rings(
        mesh: &'a TriangleMesh,
        rings: &[Option<OneRing>],
        field: &CurvatureField,
        reliability_threshold: f32,
    ) -> Result<Self, CurvatureError> {
        check_len("curvature samples", mesh.vertex_count(), field.len())?;
        check_len("one-rings", mesh.vertex_count(), rings.len())?;

        let neighbors = rings
            .iter()
            .map(|ring| ring.as_ref().map(|r| r.neighbors(mesh)).unwrap_or_default())
            .collect();

        Ok(Self {
            mesh,
            neighbors,
            adjacency: VertexTriangles::build(mesh),
            mask: ReliabilityMask::from_field(field, reliability_threshold),
        })
    }

    pub fn mask(&self) -> &ReliabilityMask {
        &self.mask
    }

    /// Minimize the smoothness energy and rotate the free vertices' sets
    pub fn smooth_energy(
        &self,
        field: &mut CurvatureField,
        variant: EnergyVariant,
        lbfgs: &LbfgsConfig,
    ) -> Result<(LbfgsReport, usize), CurvatureError> {
        check_len("curvature samples", self.mesh.vertex_count(), field.len())?;

        let normals = field.normals();
        let base = field.base_directions();
        let inputs = EnergyInputs {
            mesh: self.mesh,
            neighbors: &self.neighbors,
            normals: &normals,
            base: &base,
        };

        let (energy, variables): (Box<dyn SmoothingEnergy>, Vec<usize>) = match variant {
            EnergyVariant::Masked => {
                let energy = MaskedEnergy::new(&inputs, self.mask.as_slice());
                let variables = energy.variables().to_vec();
                (Box::new(energy), variables)
            }
            EnergyVariant::Unmasked => {
                let energy = UnmaskedEnergy::new(&inputs);
                let variables = energy.variables().to_vec();
                (Box::new(energy), variables)
            }
        };

        let mut theta = vec![0.0; energy.dimension()];
        let report = Lbfgs::new(lbfgs.clone()).minimize(energy.as_ref(), &mut theta);

        for (&vertex, &angle) in variables.iter().zip(&theta) {
            let sample = &mut field.samples[vertex];
            sample.directions = sample.directions.rotated(sample.normal, angle as f32);
        }

        tracing::debug!(
            "smooth_energy: {} free angles, energy {:.4} -> {:.4} after {} iterations ({:?})",
            variables.len(),
            report.initial_energy,
            report.final_energy,
            report.iterations,
            report.termination
        );
        Ok((report, variables.len()))
    }

    /// Relabel representatives so neighboring base directions agree
    pub fn flood_fill(
        &self,
        field: &mut CurvatureField,
        mode: FloodMode,
        sign_only: bool,
    ) -> Result<FloodFillReport, CurvatureError> {
        check_len("curvature samples", self.mesh.vertex_count(), field.len())?;
        Ok(flood_fill::flood_fill(
            self.mesh,
            &self.adjacency,
            field,
            mode,
            sign_only,
        ))
    }
}

/// Run the configured smoothing passes on `field` in place
///
/// The energy pass (if enabled) runs first, then the flood fill relabels the
/// result so that the base representative is consistent across triangles.
pub fn smooth_cross_field(
    mesh: &TriangleMesh,
    field: &mut CurvatureField,
    config: &SmoothingConfig,
) -> Result<SmoothingReport, CurvatureError> {
    let context = FieldSmoothingContext::new(mesh, field, config.reliability_threshold)?;
    smooth_with_context(&context, field, config)
}

pub(crate) fn smooth_with_context(
    context: &FieldSmoothingContext<'_>,
    field: &mut CurvatureField,
    config: &SmoothingConfig,
) -> Result<SmoothingReport, CurvatureError> {
    let mut report = SmoothingReport {
        reliable_vertices: context.mask().reliable_count(),
        free_variables: 0,
        optimizer: None,
        flood_fill: None,
    };

    if config.energy_smoothing {
        let (optimizer, free) = context.smooth_energy(field, config.energy_variant, &config.lbfgs)?;
        report.optimizer = Some(optimizer);
        report.free_variables = free;
    }
    if config.flood_fill {
        report.flood_fill = Some(context.flood_fill(field, config.flood_mode, config.sign_only)?);
    }
    Ok(report)
}
