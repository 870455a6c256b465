pub mod ssa_map;

pub use ssa_map::{SsaDifference, SsaMap, SsaMapBuilder, UNSET_INDEX};
