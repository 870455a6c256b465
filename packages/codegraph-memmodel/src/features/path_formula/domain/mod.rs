mod path_formula;

pub use path_formula::PathFormula;
