//! Feature modules, one vertical slice each
//!
//! Each feature contains some of:
//! - domain/         - value types and pure operations
//! - application/    - entry points used by other features
//! - infrastructure/ - algorithms and caches behind those entry points
//!
//! Dependency order: formula, ssa, type_layout, pointer_target,
//! pointer_target_set, retention, assignment, edge_translation, merge,
//! path_formula.

pub mod formula;
pub mod ssa;
pub mod type_layout;

pub mod pointer_target;
pub mod pointer_target_set;

pub mod assignment;
pub mod retention;

pub mod edge_translation;
pub mod merge;
pub mod path_formula;
