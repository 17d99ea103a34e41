//! Real-time geometric constraint solving for sketching surfaces.
//!
//! A [`ConstraintSystem`] holds draggable handles, the scalar variables
//! behind them and the relations between them. Call
//! [`ConstraintSystem::solve`] once per frame after asserting finger
//! positions; clusters of related constraints are solved independently.

pub mod config;
pub mod constraints;
pub mod error;
pub mod formula;
pub mod geometry;
pub mod handles;
pub mod ids;
pub mod solver;
pub mod system;
pub mod variables;

pub use config::SolverConfig;
pub use constraints::{AngleRef, Constraint, ConstraintKind, DistanceRef, FormulaRef, PolarVectorRef};
pub use error::{ConfigError, ConstraintError, MinimizerError, SolveError};
pub use formula::FormulaFn;
pub use handles::Handle;
pub use ids::{ConstraintId, HandleId, IdGenerator, VariableId};
pub use solver::{Bfgs, ClusterOutcome, ClusterReport, Minimizer, SolveReport};
pub use system::ConstraintSystem;
pub use variables::{Offset, Variable};

pub fn version() -> &'static str {
    "0.1.0"
}
