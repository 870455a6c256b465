//! # Pointer Target Set
//!
//! Per-path heap bookkeeping: which bases exist, which composite fields are
//! tracked, which allocations are still untyped, and the resulting pointer
//! targets grouped by cell type.
//!
//! ## Lifecycle
//! ```text
//! snapshot ──builder()──▶ PointerTargetSetBuilder ──build()──▶ snapshot'
//! ```

pub mod application;
pub mod domain;

pub use application::PointerTargetSetBuilder;
pub use domain::{
    base_ordering, is_fake_base_type, CompositeField, DeferredAllocationPool, PointerTargetSet,
};
