mod translator;

pub use translator::EdgeFormulaTranslator;
