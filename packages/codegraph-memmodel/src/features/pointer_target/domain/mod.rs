pub mod pattern;
pub mod pointer_target;

pub use pattern::{PointerTargetPattern, Precision};
pub use pointer_target::PointerTarget;
