//! Behaviour shared by every high-level constraint: how it links variables,
//! what it can move, what it lowers to, and which values it pins down
//! analytically. One exhaustive match per concern.

use super::low_level::{LowLevelConstraint, PointVars};
use super::types::Constraint;
use crate::error::ConstraintResult;
use crate::geometry::polar_offset;
use crate::handles::HandleStore;
use crate::ids::{HandleId, VariableId};
use crate::solver::Knowns;
use crate::variables::{Offset, VariableStore};
use std::collections::HashSet;
use std::f64::consts::PI;

/// Something a constraint can affect. Variables are always canonical and
/// handles are always top-level, so two constraints overlap exactly when
/// they could influence each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManipulationKey {
    Variable(VariableId),
    Handle(HandleId),
}

fn point(handles: &HandleStore, id: HandleId) -> ConstraintResult<PointVars> {
    Ok(PointVars::from(handles.require(id)?))
}

impl Constraint {
    /// Apply the aliasing this constraint implies. Run for every active
    /// constraint each time the cluster partition is rebuilt.
    pub fn setup_variable_relationships(
        &self,
        store: &mut VariableStore,
        handles: &mut HandleStore,
    ) -> ConstraintResult<()> {
        match self {
            Self::LinearRelationship { y, m, x, b } => store.make_equal_to(*y, *x, Offset::new(*m, *b)?),
            Self::Absorb { parent, child } => {
                let p = point(handles, *parent)?;
                let c = point(handles, *child)?;
                store.make_equal_to(p.x, c.x, Offset::IDENTITY)?;
                store.make_equal_to(p.y, c.y, Offset::IDENTITY)?;
                handles.merge(*parent, *child)
            }
            Self::Constant { .. }
            | Self::Pin { .. }
            | Self::Finger { .. }
            | Self::Distance { .. }
            | Self::Angle { .. }
            | Self::PolarVector { .. }
            | Self::Formula { .. } => Ok(()),
        }
    }

    /// Canonical variables and top-level handles this constraint touches.
    pub fn manipulation_set(
        &self,
        store: &VariableStore,
        handles: &HandleStore,
    ) -> ConstraintResult<HashSet<ManipulationKey>> {
        let mut vars = self.variables();
        let mut set = HashSet::new();
        for handle in self.handles() {
            let h = handles.require(handle)?;
            vars.extend(h.variables());
            set.insert(ManipulationKey::Handle(handles.canonical_of(handle)?));
        }
        for var in vars {
            set.insert(ManipulationKey::Variable(store.canonical_of(var)?));
        }
        Ok(set)
    }

    /// Lower to numeric relations, deduplicating against what is already in `list`.
    pub fn add_low_level_to(
        &self,
        list: &mut Vec<LowLevelConstraint>,
        store: &mut VariableStore,
        handles: &HandleStore,
    ) -> ConstraintResult<()> {
        match self {
            Self::Distance { a, b, distance } => LowLevelConstraint::Distance {
                a: point(handles, *a)?,
                b: point(handles, *b)?,
                distance: *distance,
            }
            .add_to(list, store),
            Self::Angle { a, b, angle } => LowLevelConstraint::Angle {
                a: point(handles, *a)?,
                b: point(handles, *b)?,
                angle: *angle,
            }
            .add_to(list, store),
            Self::PolarVector { a, b, distance, angle } => {
                let (pa, pb) = (point(handles, *a)?, point(handles, *b)?);
                LowLevelConstraint::Distance { a: pa, b: pb, distance: *distance }.add_to(list, store)?;
                LowLevelConstraint::Angle { a: pa, b: pb, angle: *angle }.add_to(list, store)
            }
            Self::Formula { args, result, func } => LowLevelConstraint::Formula {
                args: args.clone(),
                result: *result,
                func: func.clone(),
            }
            .add_to(list, store),
            Self::Constant { .. }
            | Self::Pin { .. }
            | Self::Finger { .. }
            | Self::LinearRelationship { .. }
            | Self::Absorb { .. } => Ok(()),
        }
    }

    /// Write and mark every value this constraint determines on its own.
    /// Returns whether anything new became known.
    pub fn propagate_knowns(
        &self,
        store: &mut VariableStore,
        handles: &HandleStore,
        knowns: &mut Knowns,
    ) -> ConstraintResult<bool> {
        match self {
            Self::Constant { variable, value } => fix(store, knowns, *variable, *value),
            Self::Pin { handle, position } | Self::Finger { handle, position } => {
                let p = point(handles, *handle)?;
                let fixed_x = fix(store, knowns, p.x, position[0])?;
                let fixed_y = fix(store, knowns, p.y, position[1])?;
                Ok(fixed_x || fixed_y)
            }
            Self::PolarVector { a, b, distance, angle } => {
                if !knowns.contains(store, *distance)? || !knowns.contains(store, *angle)? {
                    return Ok(false);
                }
                let (pa, pb) = (point(handles, *a)?, point(handles, *b)?);
                let r = store.value(*distance)?;
                let theta = store.value(*angle)?;
                if is_fully_known(store, knowns, pa)? && is_fully_unknown(store, knowns, pb)? {
                    let origin = [store.value(pa.x)?, store.value(pa.y)?];
                    place(store, knowns, pb, polar_offset(origin, theta, r))
                } else if is_fully_known(store, knowns, pb)? && is_fully_unknown(store, knowns, pa)? {
                    let origin = [store.value(pb.x)?, store.value(pb.y)?];
                    place(store, knowns, pa, polar_offset(origin, theta + PI, r))
                } else {
                    Ok(false)
                }
            }
            Self::LinearRelationship { .. }
            | Self::Absorb { .. }
            | Self::Distance { .. }
            | Self::Angle { .. }
            | Self::Formula { .. } => Ok(false),
        }
    }
}

fn fix(store: &mut VariableStore, knowns: &mut Knowns, var: VariableId, value: f64) -> ConstraintResult<bool> {
    if knowns.contains(store, var)? {
        return Ok(false);
    }
    store.set_value(var, value)?;
    knowns.insert(store, var)
}

fn place(store: &mut VariableStore, knowns: &mut Knowns, p: PointVars, at: [f64; 2]) -> ConstraintResult<bool> {
    let fixed_x = fix(store, knowns, p.x, at[0])?;
    let fixed_y = fix(store, knowns, p.y, at[1])?;
    Ok(fixed_x || fixed_y)
}

fn is_fully_known(store: &VariableStore, knowns: &Knowns, p: PointVars) -> ConstraintResult<bool> {
    Ok(knowns.contains(store, p.x)? && knowns.contains(store, p.y)?)
}

fn is_fully_unknown(store: &VariableStore, knowns: &Knowns, p: PointVars) -> ConstraintResult<bool> {
    Ok(!knowns.contains(store, p.x)? && !knowns.contains(store, p.y)?)
}
