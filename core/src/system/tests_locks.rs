use super::ConstraintSystem;
use crate::constraints::{Constraint, ConstraintKey};
use std::f64::consts::FRAC_PI_2;

#[test]
fn test_lock_survives_merge() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(0.0, Some("x"));
    let y = sys.create_variable(0.0, Some("y"));
    sys.lock(x, Some(4.0), false).unwrap();
    sys.equals(y, x).unwrap();

    assert!(sys.is_locked(x).unwrap());
    assert!(sys.is_locked(y).unwrap());

    sys.solve().unwrap();
    assert_eq!(sys.value(y).unwrap(), 4.0);

    sys.unlock(y).unwrap();
    assert!(!sys.is_locked(x).unwrap());
    assert!(!sys.is_locked(y).unwrap());
}

#[test]
fn test_lock_covers_whole_group() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(1.0, None);
    let y = sys.create_variable(0.0, None);
    sys.linear_relationship(y, 2.0, x, 0.0).unwrap();

    sys.lock(y, Some(6.0), false).unwrap();
    assert_eq!(sys.value(x).unwrap(), 3.0);
    assert!(sys.find(&ConstraintKey::Constant(x)).is_some());
    assert!(sys.find(&ConstraintKey::Constant(y)).is_some());
}

#[test]
fn test_toggle_lock() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(1.0, None);
    assert!(sys.toggle_lock(x).unwrap());
    assert!(sys.is_locked(x).unwrap());
    assert!(!sys.toggle_lock(x).unwrap());
    assert!(!sys.is_locked(x).unwrap());
    assert_eq!(sys.constraint_count(), 0);
}

#[test]
fn test_break_off_keeps_own_lock() {
    let mut sys = ConstraintSystem::default();
    let x = sys.create_variable(1.0, None);
    let y = sys.create_variable(1.0, None);
    sys.lock(x, None, false).unwrap();
    sys.equals(y, x).unwrap();

    sys.break_off(y, x).unwrap();
    assert!(sys.is_locked(x).unwrap());
    assert!(!sys.is_locked(y).unwrap());
}

#[test]
fn test_scrub_flag_follows_lock() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([1.0, 0.0]);
    let angle = sys.angle(a, b).unwrap();

    sys.lock(angle.angle, Some(0.5), true).unwrap();
    assert!(sys.is_scrubbing(angle.angle).unwrap());

    sys.unlock(angle.angle).unwrap();
    assert!(!sys.is_scrubbing(angle.angle).unwrap());
}

#[test]
fn test_scrubbed_angle_is_held_while_solving() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([2.0, 0.0]);
    sys.pin(a, [0.0, 0.0]).unwrap();
    let polar = sys.polar_vector(a, b).unwrap();
    sys.lock(polar.distance, None, false).unwrap();
    sys.lock(polar.angle, Some(FRAC_PI_2), true).unwrap();

    sys.solve().unwrap();
    let [bx, by] = sys.position(b).unwrap();
    assert!(bx.abs() < 1e-9);
    assert!((by - 2.0).abs() < 1e-9);
    assert_eq!(sys.value(polar.angle).unwrap(), FRAC_PI_2);
}

#[test]
fn test_scrub_flag_only_holds_angles() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([2.0, 0.0]);
    sys.pin(a, [0.0, 0.0]).unwrap();
    sys.pin(b, [2.0, 0.0]).unwrap();
    let length = sys.distance(a, b).unwrap();
    let heading = sys.angle(a, b).unwrap();
    sys.set_value(length.distance, 7.5).unwrap();
    sys.set_value(heading.angle, 0.3).unwrap();
    sys.variables.set_scrubbing(length.distance, true).unwrap();
    sys.variables.set_scrubbing(heading.angle, true).unwrap();

    sys.solve().unwrap();
    assert!((sys.value(length.distance).unwrap() - 2.0).abs() < 1e-12);
    assert_eq!(sys.value(heading.angle).unwrap(), 0.3);
}

#[test]
fn test_two_finger_drag_relocks_polar_vector() {
    let mut sys = ConstraintSystem::default();
    let a = sys.create_handle([0.0, 0.0]);
    let b = sys.create_handle([3.0, 0.0]);
    let polar = sys.polar_vector(a, b).unwrap();
    sys.lock(polar.distance, None, false).unwrap();
    sys.lock(polar.angle, None, false).unwrap();

    let fa = sys.finger(a, [0.0, 0.0]).unwrap();
    let fb = sys.finger(b, [0.0, 4.0]).unwrap();
    sys.solve().unwrap();

    assert!((sys.value(polar.distance).unwrap() - 4.0).abs() < 1e-12);
    assert!((sys.value(polar.angle).unwrap() - FRAC_PI_2).abs() < 1e-12);
    let lock = sys.find(&ConstraintKey::Constant(polar.distance)).unwrap();
    match sys.constraint(lock).unwrap().constraint {
        Constraint::Constant { value, .. } => assert!((value - 4.0).abs() < 1e-12),
        ref other => panic!("expected a constant, got {:?}", other),
    }

    // Lifting both fingers leaves the vector where they put it.
    sys.remove_constraint(fa).unwrap();
    sys.remove_constraint(fb).unwrap();
    sys.solve().unwrap();
    let [bx, by] = sys.position(b).unwrap();
    assert!(bx.abs() < 1e-6);
    assert!((by - 4.0).abs() < 1e-6);
}
