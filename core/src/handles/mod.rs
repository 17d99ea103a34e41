//! Draggable points backed by two variables.
//!
//! Handles carry their own merge bookkeeping next to variable aliasing: an
//! Absorb constraint records the child under its parent so a later
//! `break_off_handle` knows which relation to undo.

use crate::error::{ConstraintError, ConstraintResult};
use crate::ids::{HandleId, VariableId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub id: HandleId,
    pub x: VariableId,
    pub y: VariableId,
    absorbed: Vec<HandleId>,
    parent: Option<HandleId>,
}

impl Handle {
    pub fn new(id: HandleId, x: VariableId, y: VariableId) -> Self {
        Self { id, x, y, absorbed: Vec::new(), parent: None }
    }

    pub fn absorbed(&self) -> &[HandleId] {
        &self.absorbed
    }

    /// The handle that absorbed this one, if any.
    pub fn parent(&self) -> Option<HandleId> {
        self.parent
    }

    pub fn is_canonical(&self) -> bool {
        self.parent.is_none()
    }

    pub fn variables(&self) -> [VariableId; 2] {
        [self.x, self.y]
    }
}

#[derive(Debug, Clone, Default)]
pub struct HandleStore {
    handles: HashMap<HandleId, Handle>,
    order: Vec<HandleId>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, handle: Handle) -> HandleId {
        let id = handle.id;
        if self.handles.insert(id, handle).is_none() {
            self.order.push(id);
        }
        id
    }

    pub fn get(&self, id: HandleId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    pub fn require(&self, id: HandleId) -> ConstraintResult<&Handle> {
        self.handles.get(&id).ok_or(ConstraintError::UnknownHandle(id))
    }

    fn require_mut(&mut self, id: HandleId) -> ConstraintResult<&mut Handle> {
        self.handles.get_mut(&id).ok_or(ConstraintError::UnknownHandle(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = HandleId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The handle whose x or y is `var`.
    pub fn owner_of(&self, var: VariableId) -> Option<HandleId> {
        self.ids().find(|id| self.handles.get(id).is_some_and(|h| h.x == var || h.y == var))
    }

    /// Follow parent links to the top-level handle.
    pub fn canonical_of(&self, id: HandleId) -> ConstraintResult<HandleId> {
        let mut current = id;
        // Bounded walk; a parent chain longer than the handle count means a cycle.
        for _ in 0..=self.handles.len() {
            match self.require(current)?.parent {
                Some(parent) => current = parent,
                None => return Ok(current),
            }
        }
        Err(ConstraintError::HandleNotAbsorbed(id))
    }

    /// Record `child` (and everything it absorbed) under `parent`.
    pub fn merge(&mut self, parent: HandleId, child: HandleId) -> ConstraintResult<()> {
        let parent = self.canonical_of(parent)?;
        if parent == self.canonical_of(child)? {
            return Ok(());
        }
        self.require(parent)?;
        if let Some(old_parent) = self.require(child)?.parent {
            self.require_mut(old_parent)?.absorbed.retain(|h| *h != child);
        }
        self.require_mut(child)?.parent = Some(parent);
        self.require_mut(parent)?.absorbed.push(child);
        Ok(())
    }

    /// Undo a merge. Errors if `child` was not absorbed.
    pub fn split(&mut self, child: HandleId) -> ConstraintResult<HandleId> {
        let parent = self
            .require(child)?
            .parent
            .ok_or(ConstraintError::HandleNotAbsorbed(child))?;
        self.require_mut(parent)?.absorbed.retain(|h| *h != child);
        self.require_mut(child)?.parent = None;
        Ok(parent)
    }

    /// Forget every merge; Absorb constraints re-record them on the next cluster rebuild.
    pub fn reset_absorption(&mut self) {
        for handle in self.handles.values_mut() {
            handle.absorbed.clear();
            handle.parent = None;
        }
    }

    pub fn remove(&mut self, id: HandleId) -> ConstraintResult<Handle> {
        if let Some(parent) = self.require(id)?.parent {
            if let Some(owner) = self.handles.get_mut(&parent) {
                owner.absorbed.retain(|h| *h != id);
            }
        }
        let children = self.require(id)?.absorbed.clone();
        for child in children {
            if let Some(handle) = self.handles.get_mut(&child) {
                handle.parent = None;
            }
        }
        self.order.retain(|h| *h != id);
        self.handles.remove(&id).ok_or(ConstraintError::UnknownHandle(id))
    }
}
