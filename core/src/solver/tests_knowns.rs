use super::knowns::compute_knowns;
use crate::constraints::{Constraint, LowLevelConstraint};
use crate::formula::FormulaFn;
use crate::handles::{Handle, HandleStore};
use crate::ids::{HandleId, IdGenerator, VariableId};
use crate::variables::{Variable, VariableStore};

struct Scene {
    ids: IdGenerator,
    store: VariableStore,
    handles: HandleStore,
}

impl Scene {
    fn new(seed: &str) -> Self {
        Self {
            ids: IdGenerator::new(seed),
            store: VariableStore::new(),
            handles: HandleStore::new(),
        }
    }

    fn var(&mut self, value: f64) -> VariableId {
        let id = self.ids.next_variable();
        self.store.add(Variable::new(id, value, None))
    }

    fn handle(&mut self, position: [f64; 2]) -> HandleId {
        let x = self.var(position[0]);
        let y = self.var(position[1]);
        let id = self.ids.next_handle();
        self.handles.add(Handle::new(id, x, y))
    }

    fn position(&self, id: HandleId) -> [f64; 2] {
        let h = self.handles.get(id).unwrap();
        [self.store.value(h.x).unwrap(), self.store.value(h.y).unwrap()]
    }
}

#[test]
fn test_finger_wins_over_pin() {
    let mut scene = Scene::new("knowns-finger");
    let h = scene.handle([0.0, 0.0]);
    let pin = Constraint::Pin { handle: h, position: [1.0, 1.0] };
    let finger = Constraint::Finger { handle: h, position: [5.0, 6.0] };

    let knowns = compute_knowns(&[&pin, &finger], &[], &mut scene.store, &scene.handles).unwrap();
    assert_eq!(knowns.len(), 2);
    assert_eq!(scene.position(h), [5.0, 6.0]);
}

#[test]
fn test_polar_vector_places_unknown_endpoint() {
    let mut scene = Scene::new("knowns-polar");
    let a = scene.handle([0.0, 0.0]);
    let b = scene.handle([9.0, 9.0]);
    let length = scene.var(0.0);
    let angle = scene.var(0.0);
    let constraints = [
        Constraint::Pin { handle: a, position: [1.0, 2.0] },
        Constraint::PolarVector { a, b, distance: length, angle },
        Constraint::Constant { variable: length, value: 3.0 },
        Constraint::Constant { variable: angle, value: std::f64::consts::FRAC_PI_2 },
    ];
    let refs: Vec<&Constraint> = constraints.iter().collect();

    let knowns = compute_knowns(&refs, &[], &mut scene.store, &scene.handles).unwrap();
    let [bx, by] = scene.position(b);
    assert!((bx - 1.0).abs() < 1e-12);
    assert!((by - 5.0).abs() < 1e-12);
    let handle_b = scene.handles.get(b).unwrap().clone();
    assert!(knowns.contains(&scene.store, handle_b.x).unwrap());
    assert!(knowns.contains(&scene.store, handle_b.y).unwrap());
}

#[test]
fn test_low_level_formula_propagates_from_locked_inputs() {
    let mut scene = Scene::new("knowns-formula");
    let x = scene.var(0.0);
    let y = scene.var(0.0);
    let result = scene.var(0.0);
    let func = FormulaFn::new(|vs: &[f64]| vs[0] * vs[1]);
    let constraints = [
        Constraint::Constant { variable: x, value: 4.0 },
        Constraint::Constant { variable: y, value: 2.5 },
    ];
    let refs: Vec<&Constraint> = constraints.iter().collect();
    let low_level = [LowLevelConstraint::Formula { args: vec![x, y], result, func }];

    let knowns = compute_knowns(&refs, &low_level, &mut scene.store, &scene.handles).unwrap();
    assert!(knowns.contains(&scene.store, result).unwrap());
    assert!((scene.store.value(result).unwrap() - 10.0).abs() < 1e-12);
}

#[test]
fn test_fixpoint_is_idempotent() {
    let mut scene = Scene::new("knowns-idempotent");
    let a = scene.handle([0.0, 0.0]);
    let b = scene.handle([3.0, 4.0]);
    let length = scene.var(0.0);
    let ha = scene.handles.get(a).unwrap().clone();
    let hb = scene.handles.get(b).unwrap().clone();
    let constraints = [
        Constraint::Pin { handle: a, position: [0.0, 0.0] },
        Constraint::Pin { handle: b, position: [3.0, 4.0] },
    ];
    let refs: Vec<&Constraint> = constraints.iter().collect();
    let low_level = [LowLevelConstraint::Distance {
        a: (&ha).into(),
        b: (&hb).into(),
        distance: length,
    }];

    let first = compute_knowns(&refs, &low_level, &mut scene.store, &scene.handles).unwrap();
    let value = scene.store.value(length).unwrap();
    let second = compute_knowns(&refs, &low_level, &mut scene.store, &scene.handles).unwrap();

    assert!(first.is_subset(&second));
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
    assert_eq!(scene.store.value(length).unwrap(), value);
    assert!((value - 5.0).abs() < 1e-12);

    let partial = compute_knowns(&refs[..1], &low_level, &mut scene.store, &scene.handles).unwrap();
    assert_eq!(partial.len(), 2);
    assert!(partial.is_subset(&first));
    assert!(!first.is_subset(&partial));
}
