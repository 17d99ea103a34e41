//! Partition of the active constraints into independently solvable groups.

use crate::constraints::{ConstraintEntry, LowLevelConstraint, ManipulationKey};
use crate::error::ConstraintResult;
use crate::handles::HandleStore;
use crate::ids::{ConstraintId, VariableId};
use crate::variables::VariableStore;
use std::collections::{HashMap, HashSet};

/// Constraints whose manipulation sets transitively overlap.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    /// In creation order.
    pub constraints: Vec<ConstraintId>,
    pub low_level: Vec<LowLevelConstraint>,
    /// Canonical variables touched by the cluster, in first-seen order.
    pub variables: Vec<VariableId>,
    /// Canonical variables derived by exactly one low-level relation and
    /// referenced by no other. Ones that turn out known are not free.
    pub free_variables: Vec<VariableId>,
    pub manipulation_set: HashSet<ManipulationKey>,
}

impl Cluster {
    pub fn contains(&self, id: ConstraintId) -> bool {
        self.constraints.contains(&id)
    }
}

/// Reset all aliasing and handle merges, then re-apply them from the active
/// constraints in creation order.
pub fn link_relationships<'a>(
    entries: impl IntoIterator<Item = &'a ConstraintEntry>,
    store: &mut VariableStore,
    handles: &mut HandleStore,
) -> ConstraintResult<()> {
    store.reset_aliasing();
    handles.reset_absorption();
    for entry in entries.into_iter().filter(|e| e.is_active()) {
        entry.constraint.setup_variable_relationships(store, handles)?;
    }
    Ok(())
}

/// Rebuild the partition from scratch. `entries` must be in creation order.
pub fn build_clusters(
    entries: &[&ConstraintEntry],
    store: &mut VariableStore,
    handles: &mut HandleStore,
) -> ConstraintResult<Vec<Cluster>> {
    link_relationships(entries.iter().copied(), store, handles)?;

    // (entry positions, merged manipulation set)
    let mut groups: Vec<(Vec<usize>, HashSet<ManipulationKey>)> = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        if !entry.is_active() {
            continue;
        }
        let mut members = vec![position];
        let mut set = entry.constraint.manipulation_set(store, handles)?;
        // One constraint can bridge several existing groups; all of them collapse.
        let mut index = 0;
        while index < groups.len() {
            if groups[index].1.is_disjoint(&set) {
                index += 1;
            } else {
                let (other_members, other_set) = groups.swap_remove(index);
                members.extend(other_members);
                set.extend(other_set);
            }
        }
        members.sort_unstable();
        groups.push((members, set));
    }
    groups.sort_by_key(|(members, _)| members[0]);

    let mut clusters = Vec::with_capacity(groups.len());
    for (members, manipulation_set) in groups {
        let mut low_level = Vec::new();
        for &position in &members {
            entries[position].constraint.add_low_level_to(&mut low_level, store, handles)?;
        }
        let mut cluster = Cluster {
            constraints: members.iter().map(|&p| entries[p].id).collect(),
            low_level,
            variables: Vec::new(),
            free_variables: Vec::new(),
            manipulation_set,
        };
        collect_variables(&mut cluster, &members, entries, store, handles)?;
        clusters.push(cluster);
    }

    tracing::debug!(
        constraints = entries.len(),
        clusters = clusters.len(),
        "rebuilt cluster partition"
    );
    Ok(clusters)
}

fn collect_variables(
    cluster: &mut Cluster,
    members: &[usize],
    entries: &[&ConstraintEntry],
    store: &VariableStore,
    handles: &HandleStore,
) -> ConstraintResult<()> {
    let mut seen = HashSet::new();
    let mut push = |var: VariableId, variables: &mut Vec<VariableId>| -> ConstraintResult<()> {
        let canonical = store.canonical_of(var)?;
        if seen.insert(canonical) {
            variables.push(canonical);
        }
        Ok(())
    };

    for &position in members {
        let constraint = &entries[position].constraint;
        for handle in constraint.handles() {
            for var in handles.require(handle)?.variables() {
                push(var, &mut cluster.variables)?;
            }
        }
        for var in constraint.variables() {
            push(var, &mut cluster.variables)?;
        }
    }
    for relation in &cluster.low_level {
        for var in relation.variables() {
            push(var, &mut cluster.variables)?;
        }
    }

    // Each relation counts once per canonical it references.
    let mut references: HashMap<VariableId, usize> = HashMap::new();
    for relation in &cluster.low_level {
        let mut canonicals = HashSet::new();
        for var in relation.variables() {
            canonicals.insert(store.canonical_of(var)?);
        }
        for canonical in canonicals {
            *references.entry(canonical).or_default() += 1;
        }
    }
    for relation in &cluster.low_level {
        let own = store.canonical_of(relation.own_variable())?;
        if references.get(&own) == Some(&1) && !cluster.free_variables.contains(&own) {
            cluster.free_variables.push(own);
        }
    }
    Ok(())
}
