//! Four-fold smoothness energy over per-vertex rotation angles.
//!
//! For every directed edge `(i, j)` the angles `phi_ij` and `phi_ji` measure
//! where the edge points relative to each endpoint's base direction. A
//! vertex's direction is its base direction rotated by `theta` about its
//! normal, and the energy
//!
//! `E = -Σ cos(4·((θi - φij) - (θj - φji)))`
//!
//! is lowest when neighboring directions agree up to quarter turns.

use glam::DVec3;

use topology::TriangleMesh;

/// Energy and gradient over a flat vector of angles
pub trait SmoothingEnergy {
    /// Number of free angles
    fn dimension(&self) -> usize;

    fn energy(&self, theta: &[f64]) -> f64;

    /// Write `∂E/∂θ` into `grad` (overwritten, length `dimension()`)
    fn gradient(&self, theta: &[f64], grad: &mut [f64]);

    /// Energy and gradient in one call
    fn energy_and_gradient(&self, theta: &[f64], grad: &mut [f64]) -> f64 {
        self.gradient(theta, grad);
        self.energy(theta)
    }
}

/// One directed edge term
#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeTerm {
    /// Variable of the source vertex
    from: usize,
    /// Variable of the target vertex; fixed at `theta = 0` when `None`
    to: Option<usize>,
    phi_ij: f64,
    phi_ji: f64,
}

/// Signed angle from `base` to the edge `from -> to` projected into the
/// tangent plane of `normal`, counter-clockwise about the normal
pub fn edge_angle(from: DVec3, to: DVec3, normal: DVec3, base: DVec3) -> Option<f64> {
    let edge = to - from;
    let tangent = (edge - normal * edge.dot(normal)).try_normalize()?;
    let angle = tangent.dot(base).clamp(-1.0, 1.0).acos();
    if normal.dot(base.cross(tangent)) >= 0.0 {
        Some(angle)
    } else {
        Some(-angle)
    }
}

/// Inputs shared by the energy variants
pub struct EnergyInputs<'a> {
    pub mesh: &'a TriangleMesh,
    /// Ordered neighbors of every vertex
    pub neighbors: &'a [Vec<usize>],
    pub normals: &'a [glam::Vec3],
    /// Base direction per vertex, zero where no estimate exists
    pub base: &'a [glam::Vec3],
}

/// Flat list of directed edge terms plus the variable-to-vertex map
#[derive(Debug, Clone, Default)]
struct EdgeTerms {
    terms: Vec<EdgeTerm>,
    variables: Vec<usize>,
}

impl EdgeTerms {
    /// Collect outgoing edges of every free vertex
    fn build(inputs: &EnergyInputs<'_>, is_free: impl Fn(usize) -> bool) -> Self {
        let vertex_count = inputs.mesh.vertex_count();
        let usable = |v: usize| inputs.base[v] != glam::Vec3::ZERO;

        let mut variable_of = vec![None; vertex_count];
        let mut variables = Vec::new();
        for vertex in 0..vertex_count {
            if usable(vertex) && is_free(vertex) {
                variable_of[vertex] = Some(variables.len());
                variables.push(vertex);
            }
        }

        let positions = inputs.mesh.positions();
        let frame = |v: usize| {
            (
                positions[v].as_dvec3(),
                inputs.normals[v].as_dvec3(),
                inputs.base[v].as_dvec3(),
            )
        };

        let edge_count: usize = variables.iter().map(|&v| inputs.neighbors[v].len()).sum();
        let mut terms = Vec::with_capacity(edge_count);
        for (var, &i) in variables.iter().enumerate() {
            let (pi, ni, ti) = frame(i);
            for &j in &inputs.neighbors[i] {
                if !usable(j) {
                    continue;
                }
                let (pj, nj, tj) = frame(j);
                let (Some(phi_ij), Some(phi_ji)) =
                    (edge_angle(pi, pj, ni, ti), edge_angle(pj, pi, nj, tj))
                else {
                    continue;
                };
                terms.push(EdgeTerm {
                    from: var,
                    to: variable_of[j],
                    phi_ij,
                    phi_ji,
                });
            }
        }

        Self { terms, variables }
    }

    #[inline]
    fn angle(term: &EdgeTerm, theta: &[f64]) -> f64 {
        let theta_j = term.to.map_or(0.0, |j| theta[j]);
        theta[term.from] - theta_j - term.phi_ij + term.phi_ji
    }

    fn energy(&self, theta: &[f64]) -> f64 {
        -self
            .terms
            .iter()
            .map(|t| (4.0 * Self::angle(t, theta)).cos())
            .sum::<f64>()
    }

    fn gradient(&self, theta: &[f64], grad: &mut [f64]) {
        grad.fill(0.0);
        for term in &self.terms {
            let g = 4.0 * (4.0 * Self::angle(term, theta)).sin();
            grad[term.from] += g;
            if let Some(j) = term.to {
                grad[j] -= g;
            }
        }
    }
}

/// Energy whose free variables are the unreliable vertices only
///
/// Reliable vertices keep `theta = 0` and anchor their neighbors.
pub struct MaskedEnergy {
    edges: EdgeTerms,
}

impl MaskedEnergy {
    pub fn new(inputs: &EnergyInputs<'_>, reliable: &[bool]) -> Self {
        Self {
            edges: EdgeTerms::build(inputs, |v| !reliable[v]),
        }
    }

    /// Vertex controlled by each variable
    pub fn variables(&self) -> &[usize] {
        &self.edges.variables
    }

    pub fn term_count(&self) -> usize {
        self.edges.terms.len()
    }
}

impl SmoothingEnergy for MaskedEnergy {
    fn dimension(&self) -> usize {
        self.edges.variables.len()
    }

    fn energy(&self, theta: &[f64]) -> f64 {
        self.edges.energy(theta)
    }

    fn gradient(&self, theta: &[f64], grad: &mut [f64]) {
        self.edges.gradient(theta, grad);
    }
}

/// Energy in which every estimated vertex is free to rotate
pub struct UnmaskedEnergy {
    edges: EdgeTerms,
}

impl UnmaskedEnergy {
    pub fn new(inputs: &EnergyInputs<'_>) -> Self {
        Self {
            edges: EdgeTerms::build(inputs, |_| true),
        }
    }

    pub fn variables(&self) -> &[usize] {
        &self.edges.variables
    }
}

impl SmoothingEnergy for UnmaskedEnergy {
    fn dimension(&self) -> usize {
        self.edges.variables.len()
    }

    fn energy(&self, theta: &[f64]) -> f64 {
        self.edges.energy(theta)
    }

    fn gradient(&self, theta: &[f64], grad: &mut [f64]) {
        self.edges.gradient(theta, grad);
    }
}

/// Central-difference gradient, for checking analytic gradients
pub fn finite_difference_gradient<E: SmoothingEnergy + ?Sized>(
    energy: &E,
    theta: &[f64],
    step: f64,
) -> Vec<f64> {
    let mut probe = theta.to_vec();
    (0..theta.len())
        .map(|i| {
            probe[i] = theta[i] + step;
            let forward = energy.energy(&probe);
            probe[i] = theta[i] - step;
            let backward = energy.energy(&probe);
            probe[i] = theta[i];
            (forward - backward) / (2.0 * step)
        })
        .collect()
}
