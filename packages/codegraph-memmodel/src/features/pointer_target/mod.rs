//! Pointer targets and the patterns classifying which of them a write may touch

pub mod domain;

pub use domain::{PointerTarget, PointerTargetPattern, Precision};
