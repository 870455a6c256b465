//! # Type Layout
//!
//! Byte sizes, alignments and member offsets of C types under a fixed
//! machine model (ILP32 or LP64 with natural alignment).
//!
//! Layouts of structs and unions are computed once per canonical type and
//! cached; the cache is shared read-mostly across workers.

pub mod domain;
pub mod infrastructure;

pub use domain::{CompositeLayout, Leaf, MachineModel, MemberLayout, TypeShape};
pub use infrastructure::TypeLayout;
