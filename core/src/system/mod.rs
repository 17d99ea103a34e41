//! The arena that owns every variable, handle and constraint, and the
//! per-frame `solve` entry point.

mod factories;

#[cfg(test)]
mod tests_lifecycle;
#[cfg(test)]
mod tests_locks;

use crate::config::SolverConfig;
use crate::constraints::{Constraint, ConstraintEntry, ConstraintKey};
use crate::error::{ConstraintError, ConstraintResult, SolveError};
use crate::handles::{Handle, HandleStore};
use crate::ids::{ConstraintId, HandleId, IdGenerator, VariableId};
use crate::solver::{build_clusters, link_relationships, solve_cluster, Bfgs, Cluster, ClusterOutcome, Minimizer, SolveReport};
use crate::variables::{Offset, Variable, VariableStore};
use std::collections::HashMap;

#[derive(Debug)]
pub struct ConstraintSystem {
    ids: IdGenerator,
    variables: VariableStore,
    handles: HandleStore,
    constraints: HashMap<ConstraintId, ConstraintEntry>,
    /// Creation order
    order: Vec<ConstraintId>,
    index: HashMap<ConstraintKey, ConstraintId>,
    /// Memoized partition; `None` after any structural change.
    clusters: Option<Vec<Cluster>>,
    config: SolverConfig,
    minimizer: Box<dyn Minimizer>,
    status_message: Option<String>,
}

impl Default for ConstraintSystem {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl ConstraintSystem {
    pub fn new(config: SolverConfig) -> Self {
        let minimizer = Box::new(Bfgs::new(config.gradient_step));
        Self::with_minimizer(config, minimizer)
    }

    pub fn with_minimizer(config: SolverConfig, minimizer: Box<dyn Minimizer>) -> Self {
        Self {
            ids: IdGenerator::default(),
            variables: VariableStore::new(),
            handles: HandleStore::new(),
            constraints: HashMap::new(),
            order: Vec::new(),
            index: HashMap::new(),
            clusters: None,
            config,
            minimizer,
            status_message: None,
        }
    }

    /// Use a seeded id sequence, so two systems fed the same calls issue the same ids.
    pub fn with_seed(mut self, seed: &str) -> Self {
        self.ids = IdGenerator::new(seed);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Set when the last `solve` diverged, cleared by the next successful one.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn handles(&self) -> &HandleStore {
        &self.handles
    }

    fn invalidate(&mut self) {
        self.clusters = None;
    }

    /// Re-derive aliasing and handle merges from the active constraints.
    fn relink(&mut self) -> ConstraintResult<()> {
        let entries = self.order.iter().filter_map(|id| self.constraints.get(id));
        link_relationships(entries, &mut self.variables, &mut self.handles)?;
        self.invalidate();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Variables
    // ---------------------------------------------------------------------

    pub fn create_variable(&mut self, value: f64, represents: Option<&str>) -> VariableId {
        let id = self.ids.next_variable();
        self.variables.add(Variable::new(id, value, represents))
    }

    pub fn variable(&self, id: VariableId) -> ConstraintResult<&Variable> {
        self.variables.require(id)
    }

    pub fn value(&self, id: VariableId) -> ConstraintResult<f64> {
        self.variables.value(id)
    }

    pub fn set_value(&mut self, id: VariableId, value: f64) -> ConstraintResult<()> {
        self.variables.set_value(id, value)
    }

    pub fn canonical_of(&self, id: VariableId) -> ConstraintResult<VariableId> {
        self.variables.canonical_of(id)
    }

    pub fn offset_of(&self, id: VariableId) -> ConstraintResult<Offset> {
        self.variables.offset_of(id)
    }

    /// Declare `this = m * that + b` as a persistent relation and apply it now.
    pub fn make_equal_to(&mut self, this: VariableId, that: VariableId, offset: Offset) -> ConstraintResult<ConstraintId> {
        self.linear_relationship(this, offset.m, that, offset.b)
    }

    /// Detach `that` from `canonical`'s group, keeping its value and its own lock.
    /// Relations that name `that` directly are removed with it.
    pub fn break_off(&mut self, canonical: VariableId, that: VariableId) -> ConstraintResult<()> {
        self.variables.break_off(canonical, that)?;
        let linking: Vec<ConstraintId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                matches!(
                    self.constraints.get(id).map(|e| &e.constraint),
                    Some(Constraint::LinearRelationship { y, x, .. }) if *y == that || *x == that
                )
            })
            .collect();
        for id in linking {
            self.detach_entry(id)?;
        }
        self.invalidate();
        Ok(())
    }

    pub fn promote_to_canonical(&mut self, id: VariableId) -> ConstraintResult<()> {
        self.variables.promote_to_canonical(id)?;
        self.invalidate();
        Ok(())
    }

    pub fn equals_variable(&self, a: VariableId, b: VariableId) -> ConstraintResult<bool> {
        self.variables.equals(a, b)
    }

    pub fn has_linear_relationship_with(&self, a: VariableId, b: VariableId) -> ConstraintResult<bool> {
        self.variables.has_linear_relationship_with(a, b)
    }

    /// Remove a variable together with every constraint that names it.
    /// Handle coordinates go through [`ConstraintSystem::remove_handle`].
    pub fn remove_variable(&mut self, id: VariableId) -> ConstraintResult<()> {
        self.variables.require(id)?;
        if let Some(handle) = self.handles.owner_of(id) {
            return Err(ConstraintError::HandleCoordinate { variable: id, handle });
        }
        let referencing: Vec<ConstraintId> = self
            .order
            .iter()
            .copied()
            .filter(|cid| {
                self.constraints
                    .get(cid)
                    .is_some_and(|e| e.constraint.variables().contains(&id))
            })
            .collect();
        for cid in referencing {
            if self.constraints.contains_key(&cid) {
                self.remove_constraint(cid)?;
            }
        }
        if self.variables.contains(id) {
            self.variables.remove(id)?;
        }
        self.relink()
    }

    // ---------------------------------------------------------------------
    // Locks
    // ---------------------------------------------------------------------

    /// Fix every member of `id`'s group at its current value, after first
    /// writing `value` if given. `scrub` marks the group as being dragged
    /// directly, which keeps it known even where it would otherwise be free.
    pub fn lock(&mut self, id: VariableId, value: Option<f64>, scrub: bool) -> ConstraintResult<()> {
        if let Some(value) = value {
            self.variables.set_value(id, value)?;
        }
        for member in self.variables.members(id)? {
            let current = self.variables.value(member)?;
            self.constant(member, current)?;
        }
        self.variables.set_scrubbing(id, scrub)
    }

    pub fn unlock(&mut self, id: VariableId) -> ConstraintResult<()> {
        for member in self.variables.members(id)? {
            if let Some(&cid) = self.index.get(&ConstraintKey::Constant(member)) {
                self.remove_constraint(cid)?;
            }
            self.variables.set_scrubbing(member, false)?;
        }
        Ok(())
    }

    /// Returns the new lock state.
    pub fn toggle_lock(&mut self, id: VariableId) -> ConstraintResult<bool> {
        if self.is_locked(id)? {
            self.unlock(id)?;
            Ok(false)
        } else {
            self.lock(id, None, false)?;
            Ok(true)
        }
    }

    pub fn is_locked(&self, id: VariableId) -> ConstraintResult<bool> {
        Ok(self
            .variables
            .members(id)?
            .iter()
            .any(|member| self.index.contains_key(&ConstraintKey::Constant(*member))))
    }

    pub fn is_scrubbing(&self, id: VariableId) -> ConstraintResult<bool> {
        for member in self.variables.members(id)? {
            if self.variables.require(member)?.scrubbing() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ---------------------------------------------------------------------
    // Handles
    // ---------------------------------------------------------------------

    pub fn create_handle(&mut self, position: [f64; 2]) -> HandleId {
        let id = self.ids.next_handle();
        let x = self.create_variable(position[0], Some("x"));
        let y = self.create_variable(position[1], Some("y"));
        self.handles.add(Handle::new(id, x, y))
    }

    pub fn handle(&self, id: HandleId) -> ConstraintResult<&Handle> {
        self.handles.require(id)
    }

    pub fn position(&self, id: HandleId) -> ConstraintResult<[f64; 2]> {
        let handle = self.handles.require(id)?;
        Ok([self.variables.value(handle.x)?, self.variables.value(handle.y)?])
    }

    pub fn set_position(&mut self, id: HandleId, position: [f64; 2]) -> ConstraintResult<()> {
        let [x, y] = self.handles.require(id)?.variables();
        self.variables.set_value(x, position[0])?;
        self.variables.set_value(y, position[1])
    }

    pub fn canonical_handle(&self, id: HandleId) -> ConstraintResult<HandleId> {
        self.handles.canonical_of(id)
    }

    pub fn absorbed_handles(&self, id: HandleId) -> ConstraintResult<Vec<HandleId>> {
        Ok(self.handles.require(id)?.absorbed().to_vec())
    }

    /// Undo the Absorb that merged `child` into another handle. The child
    /// keeps its current position.
    pub fn break_off_handle(&mut self, child: HandleId) -> ConstraintResult<()> {
        let cid = self
            .index
            .get(&ConstraintKey::Absorb { child })
            .copied()
            .ok_or(ConstraintError::HandleNotAbsorbed(child))?;
        self.detach_entry(cid)?;
        self.relink()
    }

    /// Remove a handle, its coordinate variables and every constraint that names either.
    pub fn remove_handle(&mut self, id: HandleId) -> ConstraintResult<()> {
        let [x, y] = self.handles.require(id)?.variables();
        let referencing: Vec<ConstraintId> = self
            .order
            .iter()
            .copied()
            .filter(|cid| {
                self.constraints
                    .get(cid)
                    .is_some_and(|e| e.constraint.handles().contains(&id))
            })
            .collect();
        for cid in referencing {
            if self.constraints.contains_key(&cid) {
                self.remove_constraint(cid)?;
            }
        }
        self.handles.remove(id)?;
        self.remove_variable(x)?;
        self.remove_variable(y)
    }

    // ---------------------------------------------------------------------
    // Constraint registry
    // ---------------------------------------------------------------------

    pub fn constraint(&self, id: ConstraintId) -> ConstraintResult<&ConstraintEntry> {
        self.constraints.get(&id).ok_or(ConstraintError::UnknownConstraint(id))
    }

    /// Registered constraints in creation order.
    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintEntry> + '_ {
        self.order.iter().filter_map(|id| self.constraints.get(id))
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn find(&self, key: &ConstraintKey) -> Option<ConstraintId> {
        self.index.get(key).copied()
    }

    pub fn set_paused(&mut self, id: ConstraintId, paused: bool) -> ConstraintResult<()> {
        let entry = self.constraints.get_mut(&id).ok_or(ConstraintError::UnknownConstraint(id))?;
        if entry.paused != paused {
            entry.paused = paused;
            self.relink()?;
        }
        Ok(())
    }

    pub fn is_paused(&self, id: ConstraintId) -> ConstraintResult<bool> {
        Ok(self.constraint(id)?.paused)
    }

    /// Remove a constraint and the variables it owns. Constraints that name
    /// one of those variables go with them.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> ConstraintResult<()> {
        let entry = self.detach_entry(id)?;
        for var in entry.constraint.owned_variables() {
            if self.variables.contains(var) {
                self.remove_variable(var)?;
            }
        }
        self.relink()
    }

    /// Drop an entry from the registry and the dedup index without touching
    /// its variables or re-linking.
    fn detach_entry(&mut self, id: ConstraintId) -> ConstraintResult<ConstraintEntry> {
        let entry = self.constraints.remove(&id).ok_or(ConstraintError::UnknownConstraint(id))?;
        self.order.retain(|existing| *existing != id);
        if let Some(key) = entry.constraint.key() {
            if self.index.get(&key) == Some(&id) {
                self.index.remove(&key);
            }
        }
        self.invalidate();
        Ok(entry)
    }

    /// Register a constraint, or fold it into the existing one with the same key.
    fn upsert(&mut self, constraint: Constraint) -> ConstraintResult<ConstraintId> {
        if let Some(key) = constraint.key() {
            if let Some(&id) = self.index.get(&key) {
                let entry = self.constraints.get_mut(&id).ok_or(ConstraintError::UnknownConstraint(id))?;
                if entry.constraint.merge_reassertion(&constraint) {
                    self.relink()?;
                }
                return Ok(id);
            }
        }
        constraint.setup_variable_relationships(&mut self.variables, &mut self.handles)?;
        let id = self.ids.next_constraint();
        if let Some(key) = constraint.key() {
            self.index.insert(key, id);
        }
        tracing::trace!(%id, kind = %constraint.kind(), "registered constraint");
        self.constraints.insert(id, ConstraintEntry::new(id, constraint));
        self.order.push(id);
        self.invalidate();
        Ok(id)
    }

    // ---------------------------------------------------------------------
    // Solving
    // ---------------------------------------------------------------------

    /// The current partition, rebuilt if anything structural changed since the last call.
    pub fn clusters(&mut self) -> ConstraintResult<&[Cluster]> {
        if self.clusters.is_none() {
            let entries: Vec<&ConstraintEntry> = self.order.iter().filter_map(|id| self.constraints.get(id)).collect();
            let clusters = build_clusters(&entries, &mut self.variables, &mut self.handles)?;
            self.clusters = Some(clusters);
        }
        Ok(self.clusters.as_deref().unwrap_or_default())
    }

    /// Per-frame entry point. Every cluster is solved independently; the first
    /// one whose minimizer fails aborts the frame.
    pub fn solve(&mut self) -> Result<SolveReport, SolveError> {
        self.clusters()?;
        let clusters = self.clusters.take().unwrap_or_default();
        let result = self.solve_clusters(&clusters);
        if self.clusters.is_none() {
            self.clusters = Some(clusters);
        }
        result
    }

    fn solve_clusters(&mut self, clusters: &[Cluster]) -> Result<SolveReport, SolveError> {
        let mut report = SolveReport::default();
        for cluster in clusters {
            let cluster_report = solve_cluster(
                cluster,
                &mut self.constraints,
                &mut self.variables,
                &self.handles,
                self.minimizer.as_ref(),
                &self.config,
            )?;
            if let ClusterOutcome::Diverged { reason } = &cluster_report.outcome {
                let message = format!("Solver diverged: {}", reason);
                tracing::error!(constraints = cluster_report.constraint_count, %reason, "solve aborted");
                self.status_message = Some(message);
                return Err(SolveError::Diverged { reason: reason.clone() });
            }
            report.clusters.push(cluster_report);
        }
        self.status_message = None;
        Ok(report)
    }
}
