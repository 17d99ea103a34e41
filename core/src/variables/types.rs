use crate::error::{ConstraintError, ConstraintResult};
use crate::geometry::EPSILON;
use crate::ids::VariableId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Affine relation `canonical = m * member + b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub m: f64,
    pub b: f64,
}

impl Default for Offset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Offset {
    pub const IDENTITY: Offset = Offset { m: 1.0, b: 0.0 };

    /// Build a validated offset. `m` must be finite and non-zero so the relation can be inverted.
    pub fn new(m: f64, b: f64) -> ConstraintResult<Self> {
        let offset = Self { m, b };
        offset.validate()?;
        Ok(offset)
    }

    pub fn validate(&self) -> ConstraintResult<()> {
        if !self.m.is_finite() || !self.b.is_finite() || self.m.abs() < f64::EPSILON {
            return Err(ConstraintError::InvalidOffset { m: self.m, b: self.b });
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        (self.m - 1.0).abs() < EPSILON && self.b.abs() < EPSILON
    }

    #[inline]
    pub fn to_canonical(&self, value: f64) -> f64 {
        self.m * value + self.b
    }

    #[inline]
    pub fn from_canonical(&self, canonical: f64) -> f64 {
        (canonical - self.b) / self.m
    }

    /// Compose with an inner relation: if `x = inner(y)` and `c = self(x)`, the result maps `y` to `c`.
    pub fn then(&self, inner: Offset) -> Offset {
        Offset {
            m: self.m * inner.m,
            b: self.m * inner.b + self.b,
        }
    }

    pub fn inverse(&self) -> Offset {
        Offset {
            m: 1.0 / self.m,
            b: -self.b / self.m,
        }
    }
}

/// Union-find state of a single variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aliasing {
    Canonical { absorbed: Vec<VariableId> },
    Aliased { canonical: VariableId, offset: Offset },
}

impl Default for Aliasing {
    fn default() -> Self {
        Aliasing::Canonical { absorbed: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    value: f64,
    /// What this variable stands for, for debugging (e.g. "handle.x", "distance").
    pub represents: Option<String>,
    aliasing: Aliasing,
    scrubbing: bool,
}

impl Variable {
    pub fn new(id: VariableId, value: f64, represents: Option<&str>) -> Self {
        Self {
            id,
            value,
            represents: represents.map(str::to_string),
            aliasing: Aliasing::default(),
            scrubbing: false,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn aliasing(&self) -> &Aliasing {
        &self.aliasing
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self.aliasing, Aliasing::Canonical { .. })
    }

    /// Whether this particular member was flagged as scrubbing by a lock.
    pub fn scrubbing(&self) -> bool {
        self.scrubbing
    }
}

/// Owns every variable of a constraint system.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: HashMap<VariableId, Variable>,
    /// Creation order, for stable iteration
    order: Vec<VariableId>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, variable: Variable) -> VariableId {
        let id = variable.id;
        if self.variables.insert(id, variable).is_none() {
            self.order.push(id);
        }
        id
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn require(&self, id: VariableId) -> ConstraintResult<&Variable> {
        self.variables.get(&id).ok_or(ConstraintError::UnknownVariable(id))
    }

    fn require_mut(&mut self, id: VariableId) -> ConstraintResult<&mut Variable> {
        self.variables.get_mut(&id).ok_or(ConstraintError::UnknownVariable(id))
    }

    pub fn contains(&self, id: VariableId) -> bool {
        self.variables.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variable ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.order.iter().copied()
    }

    pub fn value(&self, id: VariableId) -> ConstraintResult<f64> {
        Ok(self.require(id)?.value)
    }

    /// Write a value through the variable's group: the canonical receives the
    /// offset-adjusted value and every absorbed member is refreshed from it.
    pub fn set_value(&mut self, id: VariableId, value: f64) -> ConstraintResult<()> {
        let canonical = self.canonical_of(id)?;
        let offset = self.offset_of(id)?;
        self.write_canonical(canonical, offset.to_canonical(value))
    }

    fn write_canonical(&mut self, canonical: VariableId, value: f64) -> ConstraintResult<()> {
        let absorbed = match &self.require(canonical)?.aliasing {
            Aliasing::Canonical { absorbed } => absorbed.clone(),
            Aliasing::Aliased { .. } => return Err(ConstraintError::NotCanonical(canonical)),
        };
        self.require_mut(canonical)?.value = value;
        for member in absorbed {
            let var = self.require_mut(member)?;
            if let Aliasing::Aliased { offset, .. } = var.aliasing {
                var.value = offset.from_canonical(value);
            }
        }
        Ok(())
    }

    pub fn canonical_of(&self, id: VariableId) -> ConstraintResult<VariableId> {
        Ok(match self.require(id)?.aliasing {
            Aliasing::Canonical { .. } => id,
            Aliasing::Aliased { canonical, .. } => canonical,
        })
    }

    /// Relation from `id` to its canonical; identity for canonical variables.
    pub fn offset_of(&self, id: VariableId) -> ConstraintResult<Offset> {
        Ok(match self.require(id)?.aliasing {
            Aliasing::Canonical { .. } => Offset::IDENTITY,
            Aliasing::Aliased { offset, .. } => offset,
        })
    }

    /// The canonical followed by every absorbed member of `id`'s group.
    pub fn members(&self, id: VariableId) -> ConstraintResult<Vec<VariableId>> {
        let canonical = self.canonical_of(id)?;
        let mut members = vec![canonical];
        if let Aliasing::Canonical { absorbed } = &self.require(canonical)?.aliasing {
            members.extend(absorbed.iter().copied());
        }
        Ok(members)
    }

    /// Unify two groups so that `this = m * that + b`.
    ///
    /// Aliased arguments are resolved onto their canonicals with the offsets
    /// composed, so merging two already-aliased groups stays consistent. The
    /// canonical of `this` survives and keeps its value; the members of
    /// `that`'s group are re-derived from it.
    pub fn make_equal_to(&mut self, this: VariableId, that: VariableId, offset: Offset) -> ConstraintResult<()> {
        offset.validate()?;
        if this == that {
            return Ok(());
        }

        let this_canonical = self.canonical_of(this)?;
        let that_canonical = self.canonical_of(that)?;
        if this_canonical == that_canonical {
            let expected = offset.to_canonical(self.value(that)?);
            let actual = self.value(this)?;
            if (expected - actual).abs() > EPSILON {
                tracing::warn!(%this, %that, expected, actual, "re-merging an alias group with a conflicting offset; keeping the existing relation");
            }
            return Ok(());
        }

        if let Aliasing::Aliased { canonical, offset: this_offset } = self.require(this)?.aliasing {
            // canonical = m_this * this + b_this = m_this * (m * that + b) + b_this
            return self.make_equal_to(canonical, that, this_offset.then(offset));
        }
        if let Aliasing::Aliased { canonical, offset: that_offset } = self.require(that)?.aliasing {
            // that = (canonical - b_that) / m_that
            return self.make_equal_to(this, canonical, offset.then(that_offset.inverse()));
        }

        let that_absorbed = match &mut self.require_mut(that)?.aliasing {
            Aliasing::Canonical { absorbed } => std::mem::take(absorbed),
            Aliasing::Aliased { .. } => return Err(ConstraintError::NotCanonical(that)),
        };
        for &member in &that_absorbed {
            let member_offset = self.offset_of(member)?;
            self.require_mut(member)?.aliasing = Aliasing::Aliased {
                canonical: this,
                offset: offset.then(member_offset),
            };
        }
        self.require_mut(that)?.aliasing = Aliasing::Aliased { canonical: this, offset };

        let value = {
            let this_var = self.require_mut(this)?;
            if let Aliasing::Canonical { absorbed } = &mut this_var.aliasing {
                absorbed.push(that);
                absorbed.extend(that_absorbed);
            }
            this_var.value
        };
        self.write_canonical(this, value)
    }

    /// Detach `that` from `canonical`'s group. It keeps its last value.
    pub fn break_off(&mut self, canonical: VariableId, that: VariableId) -> ConstraintResult<()> {
        match self.require(canonical)?.aliasing {
            Aliasing::Canonical { .. } => {}
            Aliasing::Aliased { .. } => return Err(ConstraintError::NotCanonical(canonical)),
        }
        match self.require(that)?.aliasing {
            Aliasing::Aliased { canonical: owner, .. } if owner == canonical => {}
            _ => return Err(ConstraintError::NotAbsorbed { canonical, variable: that }),
        }

        if let Aliasing::Canonical { absorbed } = &mut self.require_mut(canonical)?.aliasing {
            absorbed.retain(|member| *member != that);
        }
        self.require_mut(that)?.aliasing = Aliasing::default();
        Ok(())
    }

    /// Make an absorbed variable the canonical of its group, inverting the offsets.
    pub fn promote_to_canonical(&mut self, id: VariableId) -> ConstraintResult<()> {
        let (old, offset) = match self.require(id)?.aliasing {
            Aliasing::Aliased { canonical, offset } => (canonical, offset),
            Aliasing::Canonical { .. } => return Err(ConstraintError::AlreadyCanonical(id)),
        };
        // old = m * id + b, so id = inverse(old)
        let inverse = offset.inverse();
        let others: Vec<VariableId> = match &self.require(old)?.aliasing {
            Aliasing::Canonical { absorbed } => absorbed.iter().copied().filter(|m| *m != id).collect(),
            Aliasing::Aliased { .. } => return Err(ConstraintError::NotCanonical(old)),
        };

        for &member in &others {
            let member_offset = self.offset_of(member)?;
            self.require_mut(member)?.aliasing = Aliasing::Aliased {
                canonical: id,
                offset: inverse.then(member_offset),
            };
        }
        self.require_mut(old)?.aliasing = Aliasing::Aliased { canonical: id, offset: inverse };

        let mut absorbed = vec![old];
        absorbed.extend(others);
        self.require_mut(id)?.aliasing = Aliasing::Canonical { absorbed };
        Ok(())
    }

    /// Drop all aliasing. Values are kept, so the next round of merges starts from the last solution.
    pub fn reset_aliasing(&mut self) {
        for var in self.variables.values_mut() {
            var.aliasing = Aliasing::default();
        }
    }

    /// Same group with an identity relation between the two.
    pub fn equals(&self, a: VariableId, b: VariableId) -> ConstraintResult<bool> {
        if self.canonical_of(a)? != self.canonical_of(b)? {
            return Ok(false);
        }
        let (oa, ob) = (self.offset_of(a)?, self.offset_of(b)?);
        Ok((oa.m - ob.m).abs() < EPSILON && (oa.b - ob.b).abs() < EPSILON)
    }

    /// Same group, under any affine relation.
    pub fn has_linear_relationship_with(&self, a: VariableId, b: VariableId) -> ConstraintResult<bool> {
        Ok(self.canonical_of(a)? == self.canonical_of(b)?)
    }

    pub(crate) fn set_scrubbing(&mut self, id: VariableId, scrubbing: bool) -> ConstraintResult<()> {
        self.require_mut(id)?.scrubbing = scrubbing;
        Ok(())
    }

    /// Remove a variable. Members it had absorbed become canonical again.
    pub fn remove(&mut self, id: VariableId) -> ConstraintResult<Variable> {
        match self.require(id)?.aliasing.clone() {
            Aliasing::Aliased { canonical, .. } => {
                if let Some(owner) = self.variables.get_mut(&canonical) {
                    if let Aliasing::Canonical { absorbed } = &mut owner.aliasing {
                        absorbed.retain(|member| *member != id);
                    }
                }
            }
            Aliasing::Canonical { absorbed } => {
                for member in absorbed {
                    if let Some(var) = self.variables.get_mut(&member) {
                        var.aliasing = Aliasing::default();
                    }
                }
            }
        }
        self.order.retain(|existing| *existing != id);
        self.variables.remove(&id).ok_or(ConstraintError::UnknownVariable(id))
    }
}
