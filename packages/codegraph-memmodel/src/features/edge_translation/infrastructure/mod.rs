mod allocation;
mod edge_state;
mod expression_encoder;
mod lvalue_pattern;

pub use allocation::ALLOCATION_PREFIX;
pub use edge_state::{EdgeState, RETURN_VARIABLE};
pub use expression_encoder::{Access, Location};
