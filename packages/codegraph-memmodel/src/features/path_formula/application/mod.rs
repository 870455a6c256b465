mod manager;

pub use manager::PathFormulaManager;
