mod values;

pub use values::{Lvalue, Rvalue, TypedRvalue};
