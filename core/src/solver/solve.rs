//! Solving a single cluster: knowns, gesture overrides, minimization, writeback.

use super::cluster::Cluster;
use super::knowns::{compute_knowns, Knowns};
use super::minimizer::{MinimizeStatus, Minimizer};
use super::result::{ClusterOutcome, ClusterReport};
use crate::config::SolverConfig;
use crate::constraints::{Constraint, ConstraintEntry, LowLevelConstraint, PointVars, ValueSource};
use crate::error::{ConstraintError, ConstraintResult};
use crate::geometry::{direction_angle, distance, unwrap_angle};
use crate::handles::HandleStore;
use crate::ids::{ConstraintId, HandleId, VariableId};
use crate::variables::VariableStore;
use std::collections::{HashMap, HashSet};

/// Solve one cluster in place. Minimizer failures come back as
/// [`ClusterOutcome::Diverged`]; only structural problems are errors.
pub fn solve_cluster(
    cluster: &Cluster,
    entries: &mut HashMap<ConstraintId, ConstraintEntry>,
    store: &mut VariableStore,
    handles: &HandleStore,
    minimizer: &dyn Minimizer,
    config: &SolverConfig,
) -> ConstraintResult<ClusterReport> {
    let (mut knowns, relocks) = {
        let constraints = cluster
            .constraints
            .iter()
            .map(|id| entries.get(id).map(|e| &e.constraint).ok_or(ConstraintError::UnknownConstraint(*id)))
            .collect::<ConstraintResult<Vec<&Constraint>>>()?;
        let knowns = compute_knowns(&constraints, &cluster.low_level, store, handles)?;
        let relocks = two_finger_relocks(&constraints, store, handles)?;
        (knowns, relocks)
    };

    // Both ends of a polar vector under fingers: its locked length and
    // direction follow the fingers instead of resisting them.
    for (var, target) in relocks {
        store.set_value(var, target)?;
        knowns.insert(store, var)?;
        let canonical = store.canonical_of(var)?;
        for id in &cluster.constraints {
            if let Some(ConstraintEntry { constraint: Constraint::Constant { variable, value }, .. }) = entries.get_mut(id) {
                if store.canonical_of(*variable)? == canonical {
                    *value = store.value(*variable)?;
                }
            }
        }
    }

    // An angle being scrubbed holds whatever value the gesture gave it.
    for relation in &cluster.low_level {
        let LowLevelConstraint::Angle { angle, .. } = relation else {
            continue;
        };
        let mut scrubbing = false;
        for member in store.members(*angle)? {
            scrubbing |= store.require(member)?.scrubbing();
        }
        if scrubbing {
            knowns.insert(store, *angle)?;
        }
    }

    let free: HashSet<VariableId> = cluster
        .free_variables
        .iter()
        .copied()
        .filter(|c| !knowns.contains_canonical(*c))
        .collect();
    let inputs: Vec<VariableId> = cluster
        .variables
        .iter()
        .copied()
        .filter(|c| !knowns.contains_canonical(*c) && !free.contains(c))
        .collect();
    let slots: HashMap<VariableId, usize> = inputs.iter().enumerate().map(|(i, c)| (*c, i)).collect();
    let mut base = HashMap::with_capacity(cluster.variables.len());
    for &canonical in &cluster.variables {
        base.insert(canonical, store.value(canonical)?);
    }
    let initial: Vec<f64> = inputs.iter().map(|c| base[c]).collect();

    let mut report = ClusterReport {
        constraint_count: cluster.constraints.len(),
        input_count: inputs.len(),
        outcome: ClusterOutcome::Converged { iterations: 0 },
    };

    let snapshot: &VariableStore = store;
    let frame = |x: &[f64]| -> (f64, Vec<(VariableId, f64)>) {
        let values = FrameValues {
            store: snapshot,
            base: &base,
            slots: &slots,
            x,
            knowns: &knowns,
            free: &free,
        };
        evaluate(&cluster.low_level, &values)
    };

    let solution = if inputs.is_empty() {
        Some(initial)
    } else {
        let mut objective = |x: &[f64]| frame(x).0;
        match minimizer.minimize(&mut objective, &initial, config.max_iterations, config.tolerance) {
            Err(err) => {
                report.outcome = ClusterOutcome::Diverged { reason: err.to_string() };
                None
            }
            Ok(result) if result.status == MinimizeStatus::HitIterationCap => {
                tracing::debug!(
                    iterations = result.iterations,
                    inputs = inputs.len(),
                    message = %result.message,
                    "cluster hit the iteration cap; keeping previous values"
                );
                report.outcome = ClusterOutcome::HitIterationCap { iterations: result.iterations };
                None
            }
            Ok(result) => {
                report.outcome = ClusterOutcome::Converged { iterations: result.iterations };
                Some(result.solution)
            }
        }
    };

    if let Some(solution) = solution {
        // One more pass at the final point so free variables adopt their live values.
        let (residual, adoptions) = frame(solution.as_slice());
        for (canonical, value) in inputs.iter().zip(&solution) {
            store.set_value(*canonical, *value)?;
        }
        for (var, value) in adoptions {
            store.set_value(var, value)?;
        }
        tracing::debug!(
            constraints = report.constraint_count,
            inputs = report.input_count,
            residual,
            "cluster solved"
        );
    }
    Ok(report)
}

fn evaluate(relations: &[LowLevelConstraint], values: &FrameValues<'_>) -> (f64, Vec<(VariableId, f64)>) {
    let mut total = 0.0;
    let mut adoptions = Vec::new();
    for relation in relations {
        let residual = relation.evaluate(values);
        total += residual.error * residual.error;
        if let Some(value) = residual.adopt {
            adoptions.push((relation.own_variable(), value));
        }
    }
    (total, adoptions)
}

/// Locked length and angle variables of polar vectors whose two endpoints
/// both carry an active finger, paired with the value the fingers imply.
fn two_finger_relocks(
    constraints: &[&Constraint],
    store: &VariableStore,
    handles: &HandleStore,
) -> ConstraintResult<Vec<(VariableId, f64)>> {
    let mut fingered: HashSet<HandleId> = HashSet::new();
    let mut locked: HashSet<VariableId> = HashSet::new();
    for constraint in constraints {
        match constraint {
            Constraint::Finger { handle, .. } => {
                fingered.insert(handles.canonical_of(*handle)?);
            }
            Constraint::Constant { variable, .. } => {
                locked.insert(store.canonical_of(*variable)?);
            }
            _ => {}
        }
    }

    let mut relocks = Vec::new();
    for constraint in constraints {
        let Constraint::PolarVector { a, b, distance: length, angle } = constraint else {
            continue;
        };
        if !fingered.contains(&handles.canonical_of(*a)?) || !fingered.contains(&handles.canonical_of(*b)?) {
            continue;
        }
        let pa = PointVars::from(handles.require(*a)?);
        let pb = PointVars::from(handles.require(*b)?);
        let from = [store.value(pa.x)?, store.value(pa.y)?];
        let to = [store.value(pb.x)?, store.value(pb.y)?];
        if locked.contains(&store.canonical_of(*length)?) {
            relocks.push((*length, distance(from, to)));
        }
        if locked.contains(&store.canonical_of(*angle)?) {
            relocks.push((*angle, unwrap_angle(store.value(*angle)?, direction_angle(from, to))));
        }
    }
    Ok(relocks)
}

/// Variable values for one objective evaluation: minimizer inputs come from
/// `x`, everything else from the snapshot taken before minimizing.
struct FrameValues<'a> {
    store: &'a VariableStore,
    base: &'a HashMap<VariableId, f64>,
    slots: &'a HashMap<VariableId, usize>,
    x: &'a [f64],
    knowns: &'a Knowns,
    free: &'a HashSet<VariableId>,
}

impl FrameValues<'_> {
    fn canonical_value(&self, canonical: VariableId) -> f64 {
        if let Some(&slot) = self.slots.get(&canonical) {
            return self.x[slot];
        }
        match self.base.get(&canonical) {
            Some(value) => *value,
            None => self.store.value(canonical).unwrap_or(f64::NAN),
        }
    }
}

impl ValueSource for FrameValues<'_> {
    fn value(&self, var: VariableId) -> f64 {
        match (self.store.canonical_of(var), self.store.offset_of(var)) {
            (Ok(canonical), Ok(offset)) => offset.from_canonical(self.canonical_value(canonical)),
            _ => f64::NAN,
        }
    }

    fn is_known(&self, var: VariableId) -> bool {
        self.knowns.contains(self.store, var).unwrap_or(false)
    }

    fn is_free(&self, var: VariableId) -> bool {
        self.store
            .canonical_of(var)
            .map(|canonical| self.free.contains(&canonical))
            .unwrap_or(false)
    }
}
