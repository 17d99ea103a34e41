//! Dedup-aware constraint factories. Re-asserting a relation over the same
//! entities updates the registered constraint instead of adding another.

use super::ConstraintSystem;
use crate::constraints::{AngleRef, Constraint, ConstraintKey, DistanceRef, FormulaRef, PolarVectorRef};
use crate::error::{ConstraintError, ConstraintResult};
use crate::formula::{self, FormulaFn};
use crate::geometry::{direction_angle, distance};
use crate::ids::{ConstraintId, HandleId, VariableId};
use crate::variables::Offset;

impl ConstraintSystem {
    /// Fix `variable` at `value`. Usually reached through [`ConstraintSystem::lock`].
    pub fn constant(&mut self, variable: VariableId, value: f64) -> ConstraintResult<ConstraintId> {
        self.variables.require(variable)?;
        self.upsert(Constraint::Constant { variable, value })
    }

    pub fn pin(&mut self, handle: HandleId, position: [f64; 2]) -> ConstraintResult<ConstraintId> {
        self.handles.require(handle)?;
        self.upsert(Constraint::Pin { handle, position })
    }

    /// Authoritative touch position for this frame. Remove it when the touch ends.
    pub fn finger(&mut self, handle: HandleId, position: [f64; 2]) -> ConstraintResult<ConstraintId> {
        self.handles.require(handle)?;
        self.upsert(Constraint::Finger { handle, position })
    }

    /// `y = m * x + b`. Re-asserting the pair in either order replaces the coefficients.
    pub fn linear_relationship(&mut self, y: VariableId, m: f64, x: VariableId, b: f64) -> ConstraintResult<ConstraintId> {
        self.variables.require(y)?;
        self.variables.require(x)?;
        Offset::new(m, b)?;
        self.upsert(Constraint::LinearRelationship { y, m, x, b })
    }

    pub fn equals(&mut self, a: VariableId, b: VariableId) -> ConstraintResult<ConstraintId> {
        self.linear_relationship(a, 1.0, b, 0.0)
    }

    /// Merge `child` into `parent`. The child takes the parent's position.
    pub fn absorb(&mut self, parent: HandleId, child: HandleId) -> ConstraintResult<ConstraintId> {
        self.handles.require(parent)?;
        self.handles.require(child)?;
        self.upsert(Constraint::Absorb { parent, child })
    }

    pub fn distance(&mut self, a: HandleId, b: HandleId) -> ConstraintResult<DistanceRef> {
        if let Some(id) = self.find(&ConstraintKey::Distance(a, b)) {
            if let Constraint::Distance { distance, .. } = self.constraint(id)?.constraint {
                return Ok(DistanceRef { id, distance });
            }
        }
        let (pa, pb) = (self.position(a)?, self.position(b)?);
        let var = self.create_variable(distance(pa, pb), Some("distance"));
        let id = self.upsert(Constraint::Distance { a, b, distance: var })?;
        Ok(DistanceRef { id, distance: var })
    }

    pub fn angle(&mut self, a: HandleId, b: HandleId) -> ConstraintResult<AngleRef> {
        if let Some(id) = self.find(&ConstraintKey::Angle(a, b)) {
            if let Constraint::Angle { angle, .. } = self.constraint(id)?.constraint {
                return Ok(AngleRef { id, angle });
            }
        }
        let (pa, pb) = (self.position(a)?, self.position(b)?);
        let var = self.create_variable(direction_angle(pa, pb), Some("angle"));
        let id = self.upsert(Constraint::Angle { a, b, angle: var })?;
        Ok(AngleRef { id, angle: var })
    }

    /// Length and direction of `a -> b`, each lockable on its own.
    pub fn polar_vector(&mut self, a: HandleId, b: HandleId) -> ConstraintResult<PolarVectorRef> {
        if let Some(id) = self.find(&ConstraintKey::PolarVector(a, b)) {
            if let Constraint::PolarVector { distance, angle, .. } = self.constraint(id)?.constraint {
                return Ok(PolarVectorRef { id, distance, angle });
            }
        }
        let (pa, pb) = (self.position(a)?, self.position(b)?);
        let length = self.create_variable(distance(pa, pb), Some("distance"));
        let angle = self.create_variable(direction_angle(pa, pb), Some("angle"));
        let id = self.upsert(Constraint::PolarVector { a, b, distance: length, angle })?;
        Ok(PolarVectorRef { id, distance: length, angle })
    }

    /// `result = func(args)`, with a fresh result variable owned by the constraint.
    pub fn formula(&mut self, args: &[VariableId], func: impl Into<FormulaFn>) -> ConstraintResult<FormulaRef> {
        let func = func.into();
        let mut values = Vec::with_capacity(args.len());
        for &arg in args {
            values.push(self.variables.value(arg)?);
        }
        let result = self.create_variable(func.call(&values), Some("formula"));
        let id = self.upsert(Constraint::Formula { args: args.to_vec(), result, func })?;
        Ok(FormulaRef { id, result })
    }

    /// Compile `source` with `names[i]` bound to `args[i]` and register it as a formula.
    pub fn formula_from_source(
        &mut self,
        args: &[VariableId],
        names: &[&str],
        source: &str,
    ) -> ConstraintResult<FormulaRef> {
        if names.len() != args.len() {
            return Err(ConstraintError::ArityMismatch { expected: names.len(), got: args.len() });
        }
        let func = formula::compile(source, names)?;
        self.formula(args, func)
    }
}
