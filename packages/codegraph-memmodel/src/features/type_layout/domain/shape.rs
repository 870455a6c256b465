//! Closed type-shape enumeration
//!
//! Target generation, assignment lowering and layout computation all dispatch
//! on `TypeShape` instead of inspecting `CType` variants themselves.

use crate::shared::models::{CanonicalType, CompositeKind};
use std::sync::Arc;

/// One member of a laid-out composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLayout {
    pub name: String,
    pub ty: CanonicalType,
    pub offset: u64,
}

/// Byte layout of one struct or union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLayout {
    pub ty: CanonicalType,
    pub kind: CompositeKind,
    pub name: String,
    pub size: u64,
    pub align: u64,
    pub members: Vec<MemberLayout>,
}

impl CompositeLayout {
    pub fn member(&self, name: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|m| m.name == name)
    }

    #[inline]
    pub fn is_union(&self) -> bool {
        self.kind == CompositeKind::Union
    }
}

#[derive(Debug, Clone)]
pub enum TypeShape {
    /// `length` is the declared length, or the configured default when unknown
    Array { element: CanonicalType, length: u64 },
    Composite(Arc<CompositeLayout>),
    /// Arithmetic types, pointers and incomplete types
    Scalar,
    Function,
}

/// A scalar sub-object reached by walking a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub ty: CanonicalType,
    /// Innermost array or composite holding the leaf; `None` at top level
    pub container: Option<CanonicalType>,
    pub proper_offset: u64,
    pub container_offset: u64,
}
