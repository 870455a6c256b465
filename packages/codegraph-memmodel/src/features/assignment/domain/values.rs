use crate::features::formula::Formula;
use crate::shared::models::CanonicalType;

/// Destination of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lvalue {
    /// A memory cell at the given address
    Address(Formula),
    /// A pure (non-memory) SSA variable
    Variable(String),
}

/// Source of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rvalue {
    /// Unconstrained value
    Nondet,
    /// Already encoded scalar value, broadcast over aggregates
    Value(Formula),
    /// Object stored in memory at the given address
    Address(Formula),
    /// Object held in a pure variable
    Variable(String),
    /// Brace initializer, one entry per element or member
    List(Vec<TypedRvalue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedRvalue {
    pub ty: CanonicalType,
    pub value: Rvalue,
}

impl TypedRvalue {
    pub fn new(ty: CanonicalType, value: Rvalue) -> Self {
        Self { ty, value }
    }
}
