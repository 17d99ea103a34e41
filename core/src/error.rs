//! Error types shared across the solver.
//!
//! Structural errors ([`ConstraintError`]) signal a logic defect in the
//! caller and are never recovered from inside the crate. Minimizer failures
//! abort the current frame only; see [`SolveError`].

use crate::formula::FormulaError;
use crate::ids::{ConstraintId, HandleId, VariableId};
use thiserror::Error;

/// Errors raised by structural operations on variables, handles and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(VariableId),

    #[error("Unknown handle: {0}")]
    UnknownHandle(HandleId),

    #[error("Unknown constraint: {0}")]
    UnknownConstraint(ConstraintId),

    #[error("Variable {variable} is not absorbed by {canonical}")]
    NotAbsorbed {
        canonical: VariableId,
        variable: VariableId,
    },

    #[error("Variable {0} is not canonical")]
    NotCanonical(VariableId),

    #[error("Variable {0} is already canonical")]
    AlreadyCanonical(VariableId),

    #[error("Handle {0} is not absorbed by another handle")]
    HandleNotAbsorbed(HandleId),

    #[error("Variable {variable} is a coordinate of handle {handle}; remove the handle instead")]
    HandleCoordinate { variable: VariableId, handle: HandleId },

    #[error("Invalid offset: m = {m}, b = {b}")]
    InvalidOffset { m: f64, b: f64 },

    #[error("Formula expects {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// Errors reported by a [`crate::solver::Minimizer`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MinimizerError {
    #[error("Objective is not finite at the initial guess")]
    NonFiniteStart,

    #[error("Minimizer failed: {0}")]
    Failed(String),
}

/// Errors that abort a whole `solve()` frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error(transparent)]
    Structural(#[from] ConstraintError),

    #[error("Solver diverged: {reason}")]
    Diverged { reason: String },
}

/// Errors loading a [`crate::config::SolverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid solver config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid solver config: {0}")]
    Invalid(String),
}

pub type ConstraintResult<T> = Result<T, ConstraintError>;
pub type MinimizerResult<T> = Result<T, MinimizerError>;
