//! # Path Formula
//!
//! A formula for a set of program paths together with the SSA map and
//! pointer-target set reached at their end. Built edge by edge with
//! `make_and`, joined at control-flow merges with `make_or`.

pub mod application;
pub mod domain;

pub use application::PathFormulaManager;
pub use domain::PathFormula;
