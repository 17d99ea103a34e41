//! Numeric relations handed to the minimizer.
//!
//! Each low-level constraint derives exactly one variable from its inputs.
//! When that variable is free it simply adopts the computed value;
//! otherwise the constraint contributes the residual `computed - value`.

use crate::error::ConstraintResult;
use crate::formula::FormulaFn;
use crate::geometry::{angle_delta, direction_angle, distance, polar_offset, unwrap_angle};
use crate::handles::Handle;
use crate::ids::VariableId;
use crate::solver::Knowns;
use crate::variables::{Offset, VariableStore};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointVars {
    pub x: VariableId,
    pub y: VariableId,
}

impl From<&Handle> for PointVars {
    fn from(handle: &Handle) -> Self {
        Self { x: handle.x, y: handle.y }
    }
}

impl PointVars {
    fn same_point(&self, other: &PointVars, store: &VariableStore) -> ConstraintResult<bool> {
        Ok(store.canonical_of(self.x)? == store.canonical_of(other.x)?
            && store.canonical_of(self.y)? == store.canonical_of(other.y)?)
    }
}

/// Read access to variable values during a solve.
pub trait ValueSource {
    fn value(&self, var: VariableId) -> f64;
    fn is_known(&self, var: VariableId) -> bool;
    fn is_free(&self, var: VariableId) -> bool;

    fn point(&self, p: PointVars) -> [f64; 2] {
        [self.value(p.x), self.value(p.y)]
    }
}

/// Outcome of evaluating one low-level constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub error: f64,
    /// New value for the constraint's own variable, when that variable is free.
    pub adopt: Option<f64>,
}

impl Residual {
    fn adopted(value: f64) -> Self {
        Self { error: 0.0, adopt: Some(value) }
    }

    fn error(error: f64) -> Self {
        Self { error, adopt: None }
    }
}

#[derive(Debug, Clone)]
pub enum LowLevelConstraint {
    Distance { a: PointVars, b: PointVars, distance: VariableId },
    Angle { a: PointVars, b: PointVars, angle: VariableId },
    Formula { args: Vec<VariableId>, result: VariableId, func: FormulaFn },
}

impl LowLevelConstraint {
    /// The variable this constraint derives.
    pub fn own_variable(&self) -> VariableId {
        match self {
            Self::Distance { distance, .. } => *distance,
            Self::Angle { angle, .. } => *angle,
            Self::Formula { result, .. } => *result,
        }
    }

    pub fn inputs(&self) -> Vec<VariableId> {
        match self {
            Self::Distance { a, b, .. } | Self::Angle { a, b, .. } => vec![a.x, a.y, b.x, b.y],
            Self::Formula { args, .. } => args.clone(),
        }
    }

    /// Inputs followed by the own variable.
    pub fn variables(&self) -> Vec<VariableId> {
        let mut vars = self.inputs();
        vars.push(self.own_variable());
        vars
    }

    /// Append to `list`, unless an equivalent distance or angle over the same
    /// pair of points is already there; in that case the two derived variables
    /// are unified instead. A reversed angle pair differs by PI.
    pub fn add_to(self, list: &mut Vec<LowLevelConstraint>, store: &mut VariableStore) -> ConstraintResult<()> {
        for existing in list.iter() {
            match (existing, &self) {
                (
                    Self::Distance { a: ea, b: eb, distance: existing_var },
                    Self::Distance { a, b, distance },
                ) => {
                    let same = ea.same_point(a, store)? && eb.same_point(b, store)?;
                    let reversed = ea.same_point(b, store)? && eb.same_point(a, store)?;
                    if same || reversed {
                        store.make_equal_to(*existing_var, *distance, Offset::IDENTITY)?;
                        return Ok(());
                    }
                }
                (Self::Angle { a: ea, b: eb, angle: existing_var }, Self::Angle { a, b, angle }) => {
                    if ea.same_point(a, store)? && eb.same_point(b, store)? {
                        store.make_equal_to(*existing_var, *angle, Offset::IDENTITY)?;
                        return Ok(());
                    }
                    if ea.same_point(b, store)? && eb.same_point(a, store)? {
                        store.make_equal_to(*existing_var, *angle, Offset { m: 1.0, b: PI })?;
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        list.push(self);
        Ok(())
    }

    fn compute(&self, src: &dyn ValueSource) -> f64 {
        match self {
            Self::Distance { a, b, .. } => distance(src.point(*a), src.point(*b)),
            Self::Angle { a, b, angle } => unwrap_angle(src.value(*angle), direction_angle(src.point(*a), src.point(*b))),
            Self::Formula { args, func, .. } => {
                let values: Vec<f64> = args.iter().map(|v| src.value(*v)).collect();
                func.call(&values)
            }
        }
    }

    /// If the own variable is unknown and every input is known, compute it and mark it known.
    pub fn propagate_knowns(&self, store: &mut VariableStore, knowns: &mut Knowns) -> ConstraintResult<bool> {
        let own = self.own_variable();
        if knowns.contains(store, own)? {
            return Ok(false);
        }
        for input in self.inputs() {
            if !knowns.contains(store, input)? {
                return Ok(false);
            }
        }
        let value = {
            let src = StoreValues { store, knowns };
            self.compute(&src)
        };
        store.set_value(own, value)?;
        knowns.insert(store, own)?;
        Ok(true)
    }

    pub fn evaluate(&self, src: &dyn ValueSource) -> Residual {
        let own = self.own_variable();
        if src.is_free(own) {
            return Residual::adopted(self.compute(src));
        }
        match self {
            Self::Distance { .. } | Self::Formula { .. } => Residual::error(self.compute(src) - src.value(own)),
            Self::Angle { a, b, angle } => Residual::error(angle_error(src, *a, *b, src.value(*angle))),
        }
    }
}

/// Residual for a directed angle. Where only part of an endpoint is
/// undetermined the missing coordinate is inferred from the tangent of the
/// angle; of the two endpoint interpretations the smaller residual wins.
/// With both endpoints fully known this falls back to the angular difference.
fn angle_error(src: &dyn ValueSource, a: PointVars, b: PointVars, angle: f64) -> f64 {
    let pa = src.point(a);
    let pb = src.point(b);
    let r = distance(pa, pb);
    let tan = angle.tan();

    let mut best = f64::INFINITY;
    let mut consider = |candidate: f64| {
        if candidate.is_finite() && candidate < best {
            best = candidate;
        }
    };

    match (src.is_known(b.x), src.is_known(b.y)) {
        (false, false) => consider(distance(pb, polar_offset(pa, angle, r))),
        (false, true) => consider((pa[0] + (pb[1] - pa[1]) / tan - pb[0]).abs()),
        (true, false) => consider((pa[1] + (pb[0] - pa[0]) * tan - pb[1]).abs()),
        (true, true) => {}
    }
    match (src.is_known(a.x), src.is_known(a.y)) {
        (false, false) => consider(distance(pa, polar_offset(pb, angle + PI, r))),
        (false, true) => consider((pb[0] + (pa[1] - pb[1]) / tan - pa[0]).abs()),
        (true, false) => consider((pb[1] + (pa[0] - pb[0]) * tan - pa[1]).abs()),
        (true, true) => {}
    }

    if best.is_finite() {
        best
    } else {
        angle_delta(angle, direction_angle(pa, pb))
    }
}

/// Values straight from the store, used during known propagation.
struct StoreValues<'a> {
    store: &'a VariableStore,
    knowns: &'a Knowns,
}

impl ValueSource for StoreValues<'_> {
    fn value(&self, var: VariableId) -> f64 {
        self.store.value(var).unwrap_or(f64::NAN)
    }

    fn is_known(&self, var: VariableId) -> bool {
        self.knowns.contains(self.store, var).unwrap_or(false)
    }

    fn is_free(&self, _var: VariableId) -> bool {
        false
    }
}
