pub mod machine_model;
pub mod shape;

pub use machine_model::MachineModel;
pub use shape::{CompositeLayout, Leaf, MemberLayout, TypeShape};
