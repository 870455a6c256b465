pub mod constraints;
pub mod formula;

pub use constraints::Constraints;
pub use formula::{BvOp, Formula, Sort, Term};
