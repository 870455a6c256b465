mod retention_generator;

pub use retention_generator::RetentionConstraintGenerator;
