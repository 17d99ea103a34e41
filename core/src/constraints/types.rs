use crate::formula::FormulaFn;
use crate::ids::{ConstraintId, HandleId, VariableId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level relation between variables and handles.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Fixes a variable's value. This is what `lock` creates.
    Constant { variable: VariableId, value: f64 },
    /// Persistent anchor for a handle.
    Pin { handle: HandleId, position: [f64; 2] },
    /// Transient, authoritative touch position, re-asserted every frame.
    Finger { handle: HandleId, position: [f64; 2] },
    /// `y = m * x + b`
    LinearRelationship { y: VariableId, m: f64, x: VariableId, b: f64 },
    /// Merges `child` into `parent`, coordinates and bookkeeping both.
    Absorb { parent: HandleId, child: HandleId },
    Distance { a: HandleId, b: HandleId, distance: VariableId },
    /// Directed angle of the vector from `a` to `b`.
    Angle { a: HandleId, b: HandleId, angle: VariableId },
    /// Distance and angle over the same pair, lockable independently.
    PolarVector {
        a: HandleId,
        b: HandleId,
        distance: VariableId,
        angle: VariableId,
    },
    Formula {
        args: Vec<VariableId>,
        result: VariableId,
        func: FormulaFn,
    },
}

/// Discriminant of [`Constraint`], for reports and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Constant,
    Pin,
    Finger,
    LinearRelationship,
    Absorb,
    Distance,
    Angle,
    PolarVector,
    Formula,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::Pin => "pin",
            Self::Finger => "finger",
            Self::LinearRelationship => "linear-relationship",
            Self::Absorb => "absorb",
            Self::Distance => "distance",
            Self::Angle => "angle",
            Self::PolarVector => "polar-vector",
            Self::Formula => "formula",
        };
        write!(f, "{}", name)
    }
}

/// Identity of the entities a memoized constraint relates.
/// Re-asserting a relation with the same key updates the existing constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKey {
    Constant(VariableId),
    Pin(HandleId),
    Finger(HandleId),
    /// Unordered: `(x, y)` and `(y, x)` share a key.
    LinearRelationship(VariableId, VariableId),
    Absorb { child: HandleId },
    Distance(HandleId, HandleId),
    Angle(HandleId, HandleId),
    PolarVector(HandleId, HandleId),
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Constant { .. } => ConstraintKind::Constant,
            Self::Pin { .. } => ConstraintKind::Pin,
            Self::Finger { .. } => ConstraintKind::Finger,
            Self::LinearRelationship { .. } => ConstraintKind::LinearRelationship,
            Self::Absorb { .. } => ConstraintKind::Absorb,
            Self::Distance { .. } => ConstraintKind::Distance,
            Self::Angle { .. } => ConstraintKind::Angle,
            Self::PolarVector { .. } => ConstraintKind::PolarVector,
            Self::Formula { .. } => ConstraintKind::Formula,
        }
    }

    pub fn key(&self) -> Option<ConstraintKey> {
        Some(match self {
            Self::Constant { variable, .. } => ConstraintKey::Constant(*variable),
            Self::Pin { handle, .. } => ConstraintKey::Pin(*handle),
            Self::Finger { handle, .. } => ConstraintKey::Finger(*handle),
            Self::LinearRelationship { y, x, .. } => {
                ConstraintKey::LinearRelationship((*y).min(*x), (*y).max(*x))
            }
            Self::Absorb { child, .. } => ConstraintKey::Absorb { child: *child },
            Self::Distance { a, b, .. } => ConstraintKey::Distance(*a, *b),
            Self::Angle { a, b, .. } => ConstraintKey::Angle(*a, *b),
            Self::PolarVector { a, b, .. } => ConstraintKey::PolarVector(*a, *b),
            Self::Formula { .. } => return None,
        })
    }

    /// Variables created by and private to this constraint; removed with it.
    pub fn owned_variables(&self) -> Vec<VariableId> {
        match self {
            Self::Distance { distance, .. } => vec![*distance],
            Self::Angle { angle, .. } => vec![*angle],
            Self::PolarVector { distance, angle, .. } => vec![*distance, *angle],
            Self::Formula { result, .. } => vec![*result],
            _ => Vec::new(),
        }
    }

    /// Variables named directly (handle coordinates excluded).
    pub fn variables(&self) -> Vec<VariableId> {
        match self {
            Self::Constant { variable, .. } => vec![*variable],
            Self::LinearRelationship { y, x, .. } => vec![*y, *x],
            Self::Formula { args, result, .. } => {
                let mut vars = args.clone();
                vars.push(*result);
                vars
            }
            _ => self.owned_variables(),
        }
    }

    pub fn handles(&self) -> Vec<HandleId> {
        match self {
            Self::Pin { handle, .. } | Self::Finger { handle, .. } => vec![*handle],
            Self::Absorb { parent, child } => vec![*parent, *child],
            Self::Distance { a, b, .. } | Self::Angle { a, b, .. } | Self::PolarVector { a, b, .. } => {
                vec![*a, *b]
            }
            _ => Vec::new(),
        }
    }

    /// Fold a re-asserted relation with the same key into this one.
    /// Returns true when the change affects aliasing and cached clusters must be dropped.
    pub fn merge_reassertion(&mut self, incoming: &Constraint) -> bool {
        match (self, incoming) {
            (Self::Constant { value, .. }, Self::Constant { value: new, .. }) => {
                *value = *new;
                false
            }
            (Self::Pin { position, .. }, Self::Pin { position: new, .. })
            | (Self::Finger { position, .. }, Self::Finger { position: new, .. }) => {
                *position = *new;
                false
            }
            (
                Self::LinearRelationship { y, m, x, b },
                Self::LinearRelationship { y: new_y, m: new_m, x: new_x, b: new_b },
            ) => {
                // Same direction keeps the coefficients; the reversed pair is inverted
                // so the stored relation still reads y = m * x + b.
                let (next_m, next_b) = if *y == *new_y && *x == *new_x {
                    (*new_m, *new_b)
                } else {
                    (1.0 / *new_m, -*new_b / *new_m)
                };
                let changed = (*m - next_m).abs() > f64::EPSILON || (*b - next_b).abs() > f64::EPSILON;
                *m = next_m;
                *b = next_b;
                changed
            }
            (Self::Absorb { parent, .. }, Self::Absorb { parent: new_parent, .. }) => {
                let changed = *parent != *new_parent;
                *parent = *new_parent;
                changed
            }
            _ => false,
        }
    }
}

/// A registered constraint with its pause state.
#[derive(Debug, Clone)]
pub struct ConstraintEntry {
    pub id: ConstraintId,
    pub constraint: Constraint,
    pub paused: bool,
}

impl ConstraintEntry {
    pub fn new(id: ConstraintId, constraint: Constraint) -> Self {
        Self { id, constraint, paused: false }
    }

    pub fn is_active(&self) -> bool {
        !self.paused
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistanceRef {
    pub id: ConstraintId,
    pub distance: VariableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AngleRef {
    pub id: ConstraintId,
    pub angle: VariableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolarVectorRef {
    pub id: ConstraintId,
    pub distance: VariableId,
    pub angle: VariableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormulaRef {
    pub id: ConstraintId,
    pub result: VariableId,
}
