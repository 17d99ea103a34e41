use super::ConstraintSystem;
use crate::config::SolverConfig;
use crate::constraints::ConstraintKey;
use crate::error::{ConstraintError, MinimizerError, MinimizerResult, SolveError};
use crate::ids::{ConstraintId, HandleId};
use crate::solver::{Minimization, Minimizer};

fn triangle(sys: &mut ConstraintSystem) -> [HandleId; 3] {
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([3.0, 0.0]);
    let c = sys.create_handle([0.5, 3.5]);
    sys.pin(a, [0.0, 0.0]).unwrap();
    sys.pin(b, [3.0, 0.0]).unwrap();
    for (p, q, length) in [(a, b, 3.0), (a, c, 4.0), (b, c, 5.0)] {
        let d = sys.distance(p, q).unwrap();
        sys.lock(d.distance, Some(length), false).unwrap();
    }
    [a, b, c]
}

#[test]
fn test_removing_distance_keeps_handle_variables() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([1.0, 0.0]);
    let c = sys.create_handle([1.0, 1.0]);
    let pin = sys.pin(a, [0.0, 0.0]).unwrap();
    let ab = sys.distance(a, b).unwrap();
    let bc = sys.distance(b, c).unwrap();

    sys.remove_constraint(ab.id).unwrap();

    assert_eq!(
        sys.variable(ab.distance).err(),
        Some(ConstraintError::UnknownVariable(ab.distance))
    );
    for h in [a, b] {
        let handle = sys.handle(h).unwrap().clone();
        assert!(sys.variable(handle.x).is_ok());
        assert!(sys.variable(handle.y).is_ok());
    }
    assert!(sys.constraint(pin).is_ok());
    assert!(sys.constraint(bc.id).is_ok());
    assert_eq!(sys.constraint_count(), 2);
}

#[test]
fn test_removing_constraint_drops_locks_on_owned_variables() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([1.0, 0.0]);
    let ab = sys.distance(a, b).unwrap();
    sys.lock(ab.distance, Some(2.0), false).unwrap();
    assert_eq!(sys.constraint_count(), 2);

    sys.remove_constraint(ab.id).unwrap();
    assert_eq!(sys.constraint_count(), 0);
    assert_eq!(sys.find(&ConstraintKey::Constant(ab.distance)), None);
}

#[test]
fn test_remove_handle_cascades() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([1.0, 0.0]);
    sys.pin(a, [0.0, 0.0]).unwrap();
    sys.distance(a, b).unwrap();
    let x = sys.handle(a).unwrap().x;

    sys.remove_handle(a).unwrap();
    assert_eq!(sys.constraint_count(), 0);
    assert_eq!(sys.handle(a).err(), Some(ConstraintError::UnknownHandle(a)));
    assert!(sys.variable(x).is_err());
    assert!(sys.handle(b).is_ok());
}

#[test]
fn test_remove_variable_rejects_handle_coordinate() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([2.0, 0.0]);
    sys.pin(a, [0.0, 0.0]).unwrap();
    let ab = sys.distance(a, b).unwrap();
    let bx = sys.handle(b).unwrap().x;

    assert_eq!(
        sys.remove_variable(bx).unwrap_err(),
        ConstraintError::HandleCoordinate { variable: bx, handle: b }
    );
    assert!(sys.variable(bx).is_ok());
    assert!(sys.constraint(ab.id).is_ok());
    assert_eq!(sys.constraint_count(), 2);
    assert!(sys.solve().is_ok());
    assert!(sys.position(b).is_ok());
}

#[test]
fn test_absorb_and_break_off_handle() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([5.0, 5.0]);

    sys.absorb(a, b).unwrap();
    assert_eq!(sys.position(b).unwrap(), [0.0, 0.0]);
    assert_eq!(sys.canonical_handle(b).unwrap(), a);
    assert_eq!(sys.absorbed_handles(a).unwrap(), vec![b]);

    sys.break_off_handle(b).unwrap();
    assert_eq!(sys.canonical_handle(b).unwrap(), b);
    assert!(sys.absorbed_handles(a).unwrap().is_empty());
    sys.set_position(a, [1.0, 1.0]).unwrap();
    assert_eq!(sys.position(b).unwrap(), [0.0, 0.0]);

    assert_eq!(sys.break_off_handle(b), Err(ConstraintError::HandleNotAbsorbed(b)));
}

#[test]
fn test_break_off_variable_removes_its_relation() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(1.0, Some("x"));
    let y = sys.create_variable(2.0, Some("y"));
    sys.equals(y, x).unwrap();
    assert!(sys.equals_variable(x, y).unwrap());

    sys.break_off(y, x).unwrap();
    assert!(!sys.has_linear_relationship_with(x, y).unwrap());
    assert_eq!(sys.constraint_count(), 0);
    // x keeps the value it had inside the group.
    assert_eq!(sys.value(x).unwrap(), 2.0);

    assert_eq!(
        sys.break_off(y, x),
        Err(ConstraintError::NotAbsorbed { canonical: y, variable: x })
    );
}

#[test]
fn test_unknown_ids_are_reported() {
    let mut sys = ConstraintSystem::default();
    let missing = ConstraintId::new();
    assert_eq!(sys.remove_constraint(missing), Err(ConstraintError::UnknownConstraint(missing)));
    assert_eq!(sys.set_paused(missing, true), Err(ConstraintError::UnknownConstraint(missing)));
}

#[test]
fn test_pause_undoes_aliasing() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(1.0, None);
    let y = sys.create_variable(2.0, None);
    let link = sys.equals(x, y).unwrap();

    sys.set_paused(link, true).unwrap();
    assert!(sys.is_paused(link).unwrap());
    assert!(!sys.has_linear_relationship_with(x, y).unwrap());

    sys.set_paused(link, false).unwrap();
    assert!(sys.equals_variable(x, y).unwrap());
}

#[test]
fn test_nan_objective_diverges_frame() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(-1.0, Some("x"));
    let root = sys.formula_from_source(&[x], &["x"], "sqrt(x)").unwrap();
    sys.lock(root.result, Some(2.0), false).unwrap();

    let result = sys.solve();
    assert!(matches!(result, Err(SolveError::Diverged { .. })));
    assert!(sys.status_message().is_some());

    sys.lock(x, Some(4.0), false).unwrap();
    let report = sys.solve().unwrap();
    assert!(report.all_converged());
    assert_eq!(sys.status_message(), None);
}

#[derive(Debug)]
struct Failing;

impl Minimizer for Failing {
    fn minimize(
        &self,
        _objective: &mut dyn FnMut(&[f64]) -> f64,
        _initial: &[f64],
        _max_iterations: usize,
        _tolerance: f64,
    ) -> MinimizerResult<Minimization> {
        Err(MinimizerError::Failed("boom".to_string()))
    }
}

#[test]
fn test_minimizer_failure_is_frame_fatal() {
    let mut sys = ConstraintSystem::with_minimizer(SolverConfig::default(), Box::new(Failing));
    let [_, _, c] = triangle(&mut sys);
    let before = sys.position(c).unwrap();

    match sys.solve() {
        Err(SolveError::Diverged { reason }) => assert!(reason.contains("boom")),
        other => panic!("expected divergence, got {:?}", other),
    }
    assert_eq!(sys.position(c).unwrap(), before);
    assert!(sys.status_message().unwrap_or_default().contains("boom"));
}

#[test]
fn test_iteration_cap_leaves_values_untouched() {
    let config = SolverConfig { max_iterations: 1, ..SolverConfig::default() };
    let mut sys = ConstraintSystem::new(config);
    let [_, _, c] = triangle(&mut sys);
    let before = sys.position(c).unwrap();

    let report = sys.solve().unwrap();
    assert_eq!(report.skipped(), 1);
    assert!(!report.all_converged());
    assert_eq!(sys.position(c).unwrap(), before);
}
