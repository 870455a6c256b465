//! SSA index map shared by pure variables and per-type memory functions

pub mod domain;

pub use domain::{SsaDifference, SsaMap, SsaMapBuilder, UNSET_INDEX};
