//! Unconstrained minimization of a cluster's squared residual sum.

use crate::error::{MinimizerError, MinimizerResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinimizeStatus {
    Converged,
    /// Ran out of iterations; the solution is a partial result.
    HitIterationCap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimization {
    pub solution: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub status: MinimizeStatus,
    pub message: String,
}

/// Numeric backend used once per cluster per frame.
pub trait Minimizer: fmt::Debug {
    fn minimize(
        &self,
        objective: &mut dyn FnMut(&[f64]) -> f64,
        initial: &[f64],
        max_iterations: usize,
        tolerance: f64,
    ) -> MinimizerResult<Minimization>;
}

/// Quasi-Newton minimizer with a BFGS inverse-Hessian update, a
/// central-difference gradient and Armijo backtracking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bfgs {
    pub gradient_step: f64,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self { gradient_step: 1e-6 }
    }
}

impl Bfgs {
    pub fn new(gradient_step: f64) -> Self {
        Self { gradient_step }
    }

    fn gradient(&self, objective: &mut dyn FnMut(&[f64]) -> f64, x: &DVector<f64>) -> DVector<f64> {
        let mut probe = x.clone();
        DVector::from_fn(x.len(), |i, _| {
            let h = self.gradient_step * x[i].abs().max(1.0);
            probe[i] = x[i] + h;
            let forward = objective(probe.as_slice());
            probe[i] = x[i] - h;
            let backward = objective(probe.as_slice());
            probe[i] = x[i];
            (forward - backward) / (2.0 * h)
        })
    }
}

/// Apply the BFGS update for step `s` and gradient change `y`. Without
/// positive curvature the update would lose positive-definiteness, so `h`
/// restarts from the identity instead. Returns whether the update applied.
pub(crate) fn update_inverse_hessian(h: &mut DMatrix<f64>, s: &DVector<f64>, y: &DVector<f64>) -> bool {
    let ys = y.dot(s);
    if ys <= f64::EPSILON {
        *h = DMatrix::identity(s.len(), s.len());
        return false;
    }
    let hy = &*h * y;
    let scale = (ys + y.dot(&hy)) / (ys * ys);
    *h += s * s.transpose() * scale - (&hy * s.transpose() + s * hy.transpose()) / ys;
    true
}

impl Minimizer for Bfgs {
    fn minimize(
        &self,
        objective: &mut dyn FnMut(&[f64]) -> f64,
        initial: &[f64],
        max_iterations: usize,
        tolerance: f64,
    ) -> MinimizerResult<Minimization> {
        let n = initial.len();
        let mut x0 = DVector::from_column_slice(initial);
        let mut f0 = objective(x0.as_slice());
        if !f0.is_finite() {
            return Err(MinimizerError::NonFiniteStart);
        }
        let mut g0 = self.gradient(objective, &x0);
        let mut h = DMatrix::<f64>::identity(n, n);

        let mut iterations = 0;
        let mut status = MinimizeStatus::HitIterationCap;
        let mut message = String::from("maximum iterations reached");

        while iterations < max_iterations {
            if g0.iter().any(|v| !v.is_finite()) {
                return Err(MinimizerError::Failed(format!(
                    "gradient has non-finite entries at iteration {}",
                    iterations
                )));
            }
            let mut step = -(&h * &g0);
            if step.iter().any(|v| !v.is_finite()) {
                return Err(MinimizerError::Failed("search direction is not finite".to_string()));
            }
            if g0.dot(&step) >= 0.0 {
                h = DMatrix::identity(n, n);
                step = -&g0;
            }
            let step_norm = step.norm();
            if step_norm < tolerance {
                status = MinimizeStatus::Converged;
                message = "step smaller than tolerance".to_string();
                break;
            }

            let slope = g0.dot(&step);
            let mut t = 1.0;
            let mut x1 = &x0 + &step * t;
            let mut f1 = objective(x1.as_slice());
            while iterations < max_iterations {
                if t * step_norm < tolerance {
                    break;
                }
                // Armijo: accept once the decrease is at least 10% of the linear prediction.
                if f1.is_finite() && f1 - f0 < 0.1 * t * slope {
                    break;
                }
                t *= 0.5;
                iterations += 1;
                x1 = &x0 + &step * t;
                f1 = objective(x1.as_slice());
            }
            if t * step_norm < tolerance {
                status = MinimizeStatus::Converged;
                message = "line search step smaller than tolerance".to_string();
                break;
            }
            if iterations >= max_iterations {
                message = "maximum iterations reached during line search".to_string();
                break;
            }

            let g1 = self.gradient(objective, &x1);
            let y = &g1 - &g0;
            let s = &step * t;
            update_inverse_hessian(&mut h, &s, &y);

            x0 = x1;
            f0 = f1;
            g0 = g1;
            iterations += 1;
        }

        Ok(Minimization {
            solution: x0.as_slice().to_vec(),
            value: f0,
            iterations,
            status,
            message,
        })
    }
}
