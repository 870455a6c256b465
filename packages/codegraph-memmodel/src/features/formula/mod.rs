//! Formula backend
//!
//! Bit-vector and boolean terms, versioned uninterpreted-function
//! applications and the side-constraint collector used during encoding.

pub mod domain;

pub use domain::{BvOp, Constraints, Formula, Sort, Term};
