//! Scalar unknowns with union-find aliasing under affine offsets.
//!
//! A group of aliased variables has exactly one canonical member that owns
//! the stored value. Every other member records `canonical = m * member + b`
//! and has its own value refreshed whenever the canonical is written.

pub mod types;


pub use types::{Aliasing, Offset, Variable, VariableStore};
