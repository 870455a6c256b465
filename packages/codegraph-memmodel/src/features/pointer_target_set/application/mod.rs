mod builder;

pub use builder::PointerTargetSetBuilder;
