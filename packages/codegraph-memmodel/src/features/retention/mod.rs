//! # Retention
//!
//! Frame constraints for memory writes. A write creates a new version of
//! the per-type memory function; every tracked cell the write cannot have
//! touched must keep its old value under the new version.

pub mod infrastructure;

pub use infrastructure::RetentionConstraintGenerator;
