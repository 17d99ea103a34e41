//! Formula text compiler.
//!
//! Turns source such as `"hypot(dx, dy) * 2"` into a [`FormulaFn`] over
//! positional arguments, which the `formula` constraint evaluates every frame.

pub mod parser;
pub mod evaluator;

pub use evaluator::{compile, Program};
pub use parser::{parse_formula, BinaryOperator, Expr, UnaryOperator};

use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function {name} takes {expected} argument(s), got {got}")]
    WrongArgumentCount { name: String, expected: usize, got: usize },

    #[error("Unknown constant: {0}")]
    UnknownConstant(String),
}

/// Opaque numeric function of a formula's argument values.
#[derive(Clone)]
pub struct FormulaFn(Rc<dyn Fn(&[f64]) -> f64>);

impl FormulaFn {
    pub fn new(f: impl Fn(&[f64]) -> f64 + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[inline]
    pub fn call(&self, args: &[f64]) -> f64 {
        (self.0)(args)
    }
}

impl fmt::Debug for FormulaFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FormulaFn(..)")
    }
}

impl<F> From<F> for FormulaFn
where
    F: Fn(&[f64]) -> f64 + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}
