//! User-facing relations and the low-level numeric relations they lower to.

pub mod types;
pub mod low_level;
pub mod relations;

pub use low_level::{LowLevelConstraint, PointVars, Residual, ValueSource};
pub use relations::ManipulationKey;
pub use types::{
    AngleRef, Constraint, ConstraintEntry, ConstraintKey, ConstraintKind, DistanceRef, FormulaRef,
    PolarVectorRef,
};
