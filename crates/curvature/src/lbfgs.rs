//! Limited-memory BFGS minimizer.
//!
//! Two-loop recursion over the last `memory` correction pairs with a
//! backtracking Armijo line search. Only steps that decrease the energy are
//! accepted, so the returned energy never exceeds the starting energy.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crosshatch_config::LbfgsConfig;

use crate::crossfield::energy::SmoothingEnergy;

/// Why the minimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Nothing to optimize
    EmptyProblem,
    /// Gradient infinity norm fell below the tolerance
    GradientTolerance,
    /// Relative energy change fell below the tolerance
    FunctionTolerance,
    /// No decreasing step along steepest descent
    LineSearchFailed,
    MaxIterations,
}

/// Summary of one minimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LbfgsReport {
    pub iterations: usize,
    pub evaluations: usize,
    pub initial_energy: f64,
    pub final_energy: f64,
    pub termination: Termination,
}

/// Stored correction pair
struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

pub struct Lbfgs {
    config: LbfgsConfig,
}

impl Lbfgs {
    pub fn new(config: LbfgsConfig) -> Self {
        Self { config }
    }

    /// Minimize `energy` starting from `x`, which is overwritten with the
    /// best point found
    pub fn minimize<E: SmoothingEnergy + ?Sized>(&self, energy: &E, x: &mut [f64]) -> LbfgsReport {
        let n = energy.dimension();
        debug_assert_eq!(x.len(), n);

        let mut grad = vec![0.0; n];
        let mut f = energy.energy_and_gradient(x, &mut grad);
        let initial_energy = f;
        let mut evaluations = 1;

        let report = |iterations, evaluations, final_energy, termination| LbfgsReport {
            iterations,
            evaluations,
            initial_energy,
            final_energy,
            termination,
        };

        if n == 0 {
            return report(0, evaluations, f, Termination::EmptyProblem);
        }

        let memory = self.config.memory.max(1);
        let mut history: VecDeque<Correction> = VecDeque::with_capacity(memory);
        let mut direction = vec![0.0; n];
        let mut trial = vec![0.0; n];
        let mut trial_grad = vec![0.0; n];

        for iteration in 0..self.config.max_iterations {
            if inf_norm(&grad) < self.config.gradient_tolerance {
                return report(iteration, evaluations, f, Termination::GradientTolerance);
            }

            two_loop(&history, &grad, &mut direction);
            let mut slope = dot(&direction, &grad);
            if !(slope < 0.0) {
                // Curvature pairs no longer describe a descent direction
                history.clear();
                for (d, g) in direction.iter_mut().zip(&grad) {
                    *d = -g;
                }
                slope = dot(&direction, &grad);
            }

            // Scale the very first steepest-descent step to unit length
            let mut step = if history.is_empty() {
                1.0 / norm(&direction).max(1.0)
            } else {
                1.0
            };

            let mut accepted = None;
            for _ in 0..self.config.max_line_search_steps {
                for ((t, xi), di) in trial.iter_mut().zip(x.iter()).zip(&direction) {
                    *t = xi + step * di;
                }
                let f_trial = energy.energy_and_gradient(&trial, &mut trial_grad);
                evaluations += 1;
                if f_trial.is_finite() && f_trial <= f + self.config.armijo * step * slope {
                    accepted = Some(f_trial);
                    break;
                }
                step *= self.config.backtrack;
            }

            let Some(f_new) = accepted else {
                if history.is_empty() {
                    return report(iteration, evaluations, f, Termination::LineSearchFailed);
                }
                history.clear();
                continue;
            };

            let s: Vec<f64> = trial.iter().zip(x.iter()).map(|(t, xi)| t - xi).collect();
            let y: Vec<f64> = trial_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            if sy > 1e-12 {
                if history.len() == memory {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, rho: 1.0 / sy });
            }

            x.copy_from_slice(&trial);
            grad.copy_from_slice(&trial_grad);
            let change = (f - f_new).abs() / f.abs().max(f_new.abs()).max(1.0);
            f = f_new;

            if change < self.config.function_tolerance {
                return report(iteration + 1, evaluations, f, Termination::FunctionTolerance);
            }
        }

        report(self.config.max_iterations, evaluations, f, Termination::MaxIterations)
    }
}

/// `direction = -H·grad` from the stored corrections
fn two_loop(history: &VecDeque<Correction>, grad: &[f64], direction: &mut [f64]) {
    direction.copy_from_slice(grad);
    let mut alphas = Vec::with_capacity(history.len());

    for c in history.iter().rev() {
        let alpha = c.rho * dot(&c.s, direction);
        axpy(-alpha, &c.y, direction);
        alphas.push(alpha);
    }

    if let Some(last) = history.back() {
        let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
        if gamma.is_finite() && gamma > 0.0 {
            direction.iter_mut().for_each(|d| *d *= gamma);
        }
    }

    for (c, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = c.rho * dot(&c.y, direction);
        axpy(alpha - beta, &c.s, direction);
    }

    direction.iter_mut().for_each(|d| *d = -*d);
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
fn inf_norm(a: &[f64]) -> f64 {
    a.iter().fold(0.0, |m, x| m.max(x.abs()))
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shifted, badly scaled quadratic with minimum at (1, -2, 3)
    struct Quadratic;

    impl SmoothingEnergy for Quadratic {
        fn dimension(&self) -> usize {
            3
        }

        fn energy(&self, x: &[f64]) -> f64 {
            (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2) + 0.5 * (x[2] - 3.0).powi(2)
        }

        fn gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad[0] = 2.0 * (x[0] - 1.0);
            grad[1] = 20.0 * (x[1] + 2.0);
            grad[2] = x[2] - 3.0;
        }
    }

    /// Rosenbrock valley
    struct Rosenbrock;

    impl SmoothingEnergy for Rosenbrock {
        fn dimension(&self) -> usize {
            2
        }

        fn energy(&self, x: &[f64]) -> f64 {
            (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
        }

        fn gradient(&self, x: &[f64], grad: &mut [f64]) {
            grad[0] = -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]);
            grad[1] = 200.0 * (x[1] - x[0] * x[0]);
        }
    }

    #[test]
    fn test_quadratic_minimum() {
        let mut x = vec![0.0; 3];
        let report = Lbfgs::new(LbfgsConfig::default()).minimize(&Quadratic, &mut x);

        assert!((x[0] - 1.0).abs() < 1e-4);
        assert!((x[1] + 2.0).abs() < 1e-4);
        assert!((x[2] - 3.0).abs() < 1e-4);
        assert!(report.final_energy < report.initial_energy);
        assert_ne!(report.termination, Termination::LineSearchFailed);
    }

    #[test]
    fn test_rosenbrock_descends() {
        let mut x = vec![-1.2, 1.0];
        let config = LbfgsConfig {
            max_iterations: 500,
            function_tolerance: 0.0,
            ..LbfgsConfig::default()
        };
        let report = Lbfgs::new(config).minimize(&Rosenbrock, &mut x);

        assert!(report.final_energy <= report.initial_energy);
        assert!((x[0] - 1.0).abs() < 1e-2, "x = {x:?} after {report:?}");
        assert!((x[1] - 1.0).abs() < 2e-2);
    }

    #[test]
    fn test_start_at_minimum() {
        let mut x = vec![1.0, -2.0, 3.0];
        let report = Lbfgs::new(LbfgsConfig::default()).minimize(&Quadratic, &mut x);
        assert_eq!(report.termination, Termination::GradientTolerance);
        assert_eq!(report.iterations, 0);
        assert_eq!(report.final_energy, 0.0);
    }
}
