//! # Assignment
//!
//! Lowers one C assignment (scalar, array, struct or union, from a value,
//! a memory object, a pure variable or a brace list) to equalities over
//! new SSA versions, plus the retention constraints of the write.

pub mod application;
pub mod domain;

pub use application::{AssignmentEncoder, AssignmentState};
pub use domain::{Lvalue, Rvalue, TypedRvalue};
