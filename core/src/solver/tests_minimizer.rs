use super::minimizer::{update_inverse_hessian, Bfgs, MinimizeStatus, Minimizer};
use nalgebra::{DMatrix, DVector};
use crate::error::MinimizerError;

#[test]
fn test_bfgs_finds_quadratic_minimum() {
    let bfgs = Bfgs::default();
    let mut objective = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
    let result = bfgs.minimize(&mut objective, &[0.0, 0.0], 100, 1e-8).unwrap();

    assert_eq!(result.status, MinimizeStatus::Converged);
    assert!((result.solution[0] - 3.0).abs() < 1e-5);
    assert!((result.solution[1] + 1.0).abs() < 1e-5);
    assert!(result.value < 1e-9);
}

#[test]
fn test_bfgs_reports_iteration_cap() {
    let bfgs = Bfgs::default();
    let mut rosenbrock = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
    let result = bfgs.minimize(&mut rosenbrock, &[-1.2, 1.0], 2, 1e-10).unwrap();

    assert_eq!(result.status, MinimizeStatus::HitIterationCap);
    assert!(result.iterations >= 2);
}

#[test]
fn test_bfgs_rejects_non_finite_start() {
    let bfgs = Bfgs::default();
    let mut objective = |x: &[f64]| x[0].sqrt();
    let result = bfgs.minimize(&mut objective, &[-1.0], 100, 1e-6);
    assert_eq!(result, Err(MinimizerError::NonFiniteStart));
}

#[test]
fn test_bfgs_converges_on_rosenbrock_with_budget() {
    let bfgs = Bfgs::default();
    let mut rosenbrock = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
    let result = bfgs.minimize(&mut rosenbrock, &[-1.2, 1.0], 5000, 1e-8).unwrap();

    assert_eq!(result.status, MinimizeStatus::Converged);
    assert!((result.solution[0] - 1.0).abs() < 1e-3);
    assert!((result.solution[1] - 1.0).abs() < 1e-3);
}

#[test]
fn test_inverse_hessian_update_with_positive_curvature() {
    let mut h = DMatrix::<f64>::identity(2, 2);
    let s = DVector::from_vec(vec![1.0, 0.0]);
    let y = DVector::from_vec(vec![2.0, 0.0]);

    assert!(update_inverse_hessian(&mut h, &s, &y));
    assert!((h[(0, 0)] - 0.5).abs() < 1e-12);
    assert!((h[(1, 1)] - 1.0).abs() < 1e-12);
    assert!(h[(0, 1)].abs() < 1e-12);
}

#[test]
fn test_inverse_hessian_resets_on_negative_curvature() {
    let mut h = DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 1.0, 2.0]);
    let s = DVector::from_vec(vec![1.0, 0.0]);
    let y = DVector::from_vec(vec![-1.0, 0.0]);

    assert!(!update_inverse_hessian(&mut h, &s, &y));
    assert_eq!(h, DMatrix::identity(2, 2));
}

#[test]
fn test_bfgs_descends_through_concave_region() {
    // Double well with minima at x = +-1; the start sits where the curvature is negative.
    let bfgs = Bfgs::default();
    let mut well = |x: &[f64]| (x[0] * x[0] - 1.0).powi(2) + x[1] * x[1];
    let result = bfgs.minimize(&mut well, &[0.3, 0.5], 500, 1e-8).unwrap();

    assert_eq!(result.status, MinimizeStatus::Converged);
    assert!((result.solution[0] - 1.0).abs() < 1e-4);
    assert!(result.solution[1].abs() < 1e-4);
    assert!(result.value < 1e-8);
}
