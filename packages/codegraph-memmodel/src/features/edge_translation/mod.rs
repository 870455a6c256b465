//! # Edge Translation
//!
//! Turns one control-flow edge into a formula over SSA-versioned pure
//! variables and per-type memory functions, extending the pointer-target
//! set with whatever the edge declares, allocates or dereferences.
//!
//! ## Structure
//! - `infrastructure`: per-edge state, expression and lvalue encoding,
//!   deferred allocation handling
//! - `application`: statement, declaration and call encoding behind
//!   [`EdgeFormulaTranslator`]

pub mod application;
pub mod infrastructure;

pub use application::EdgeFormulaTranslator;
pub use infrastructure::{Access, EdgeState, Location, ALLOCATION_PREFIX, RETURN_VARIABLE};
