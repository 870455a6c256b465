//! # Merge
//!
//! Joins the pointer-target sets of two paths meeting at one control
//! point into a snapshot valid on both, plus the address ordering the
//! join requires.

pub mod application;
pub mod infrastructure;

pub use application::{
    MergeEngine, MergeResult, FAKE_ALLOCATION_PREFIX, UNITED_BASE_PREFIX, UNITED_FIELD_PREFIX,
};
