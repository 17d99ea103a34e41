//! Values that follow analytically from pins, fingers, locks and already
//! known inputs, so the minimizer never has to search for them.

use crate::constraints::{Constraint, ConstraintKind, LowLevelConstraint};
use crate::error::ConstraintResult;
use crate::handles::HandleStore;
use crate::ids::VariableId;
use crate::variables::VariableStore;
use std::collections::HashSet;

/// Set of known alias groups, tracked by canonical id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Knowns {
    canonicals: HashSet<VariableId>,
}

impl Knowns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, store: &VariableStore, var: VariableId) -> ConstraintResult<bool> {
        Ok(self.canonicals.contains(&store.canonical_of(var)?))
    }

    /// Mark `var`'s group known. Returns false if it already was.
    pub fn insert(&mut self, store: &VariableStore, var: VariableId) -> ConstraintResult<bool> {
        Ok(self.canonicals.insert(store.canonical_of(var)?))
    }

    pub fn contains_canonical(&self, canonical: VariableId) -> bool {
        self.canonicals.contains(&canonical)
    }

    /// Every canonical known here is also known in `other`.
    pub fn is_subset(&self, other: &Knowns) -> bool {
        self.canonicals.is_subset(&other.canonicals)
    }

    pub fn len(&self) -> usize {
        self.canonicals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonicals.is_empty()
    }
}

fn priority(constraint: &Constraint) -> u8 {
    match constraint.kind() {
        ConstraintKind::Finger => 0,
        ConstraintKind::PolarVector => 1,
        _ => 2,
    }
}

/// Run propagation to a fixpoint: fingers first, then polar vectors, then
/// every other constraint, then the low-level relations. Ties keep the
/// given order.
pub fn compute_knowns(
    constraints: &[&Constraint],
    low_level: &[LowLevelConstraint],
    store: &mut VariableStore,
    handles: &HandleStore,
) -> ConstraintResult<Knowns> {
    let mut ordered: Vec<&Constraint> = constraints.to_vec();
    ordered.sort_by_key(|c| priority(c));

    let mut knowns = Knowns::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let mut progress = false;
        for constraint in &ordered {
            progress |= constraint.propagate_knowns(store, handles, &mut knowns)?;
        }
        for relation in low_level {
            progress |= relation.propagate_knowns(store, &mut knowns)?;
        }
        if !progress {
            break;
        }
    }
    tracing::trace!(passes, known = knowns.len(), "known propagation reached fixpoint");
    Ok(knowns)
}
