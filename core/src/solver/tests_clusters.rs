use crate::system::ConstraintSystem;

fn four_handles(sys: &mut ConstraintSystem) -> [crate::ids::HandleId; 4] {
    [
        sys.create_handle([0.0, 0.0]),
        sys.create_handle([10.0, 0.0]),
        sys.create_handle([0.0, 10.0]),
        sys.create_handle([10.0, 10.0]),
    ]
}

#[test]
fn test_disjoint_constraints_form_separate_clusters() {
    let mut sys = ConstraintSystem::default();
    let [a, b, c, d] = four_handles(&mut sys);
    sys.distance(a, b).unwrap();
    sys.distance(c, d).unwrap();

    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|cluster| cluster.constraints.len() == 1));
}

#[test]
fn test_bridging_constraint_collapses_clusters() {
    let mut sys = ConstraintSystem::default();
    let [a, b, c, d] = four_handles(&mut sys);
    let ab = sys.distance(a, b).unwrap();
    let cd = sys.distance(c, d).unwrap();
    assert_eq!(sys.clusters().unwrap().len(), 2);

    let bc = sys.distance(b, c).unwrap();
    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 1);
    // Creation order survives the merge.
    assert_eq!(clusters[0].constraints, vec![ab.id, cd.id, bc.id]);
}

#[test]
fn test_shared_canonical_variable_joins_clusters() {
    let mut sys = ConstraintSystem::default();
    let [a, b, c, d] = four_handles(&mut sys);
    let ab = sys.distance(a, b).unwrap();
    let cd = sys.distance(c, d).unwrap();
    let link = sys.equals(ab.distance, cd.distance).unwrap();
    assert_eq!(sys.clusters().unwrap().len(), 1);

    sys.set_paused(link, true).unwrap();
    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 2);
    assert!(clusters.iter().all(|cluster| !cluster.contains(link)));
}

#[test]
fn test_absorbed_handles_share_a_cluster() {
    let mut sys = ConstraintSystem::default();
    let [a, b, c, d] = four_handles(&mut sys);
    sys.distance(a, b).unwrap();
    sys.distance(c, d).unwrap();
    sys.absorb(b, c).unwrap();

    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].constraints.len(), 3);
}

#[test]
fn test_single_distance_variable_is_free() {
    let mut sys = ConstraintSystem::default();
    let [a, b, _, _] = four_handles(&mut sys);
    sys.pin(a, [0.0, 0.0]).unwrap();
    sys.pin(b, [10.0, 0.0]).unwrap();
    let ab = sys.distance(a, b).unwrap();
    let canonical = sys.canonical_of(ab.distance).unwrap();

    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].free_variables, vec![canonical]);
}

#[test]
fn test_duplicate_distance_lowers_once() {
    let mut sys = ConstraintSystem::default();
    let [a, b, _, _] = four_handles(&mut sys);
    let ab = sys.distance(a, b).unwrap();
    let ba = sys.distance(b, a).unwrap();
    assert_ne!(ab.distance, ba.distance);

    let clusters = sys.clusters().unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].low_level.len(), 1);
    assert!(sys.equals_variable(ab.distance, ba.distance).unwrap());
}
