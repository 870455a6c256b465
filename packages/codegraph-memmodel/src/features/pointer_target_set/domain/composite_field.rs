use crate::shared::models::CanonicalType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked member of a struct or union, identified by the composite's key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeField {
    pub composite: String,
    pub field: String,
}

impl CompositeField {
    #[inline]
    pub fn new(composite: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            composite: composite.into(),
            field: field.into(),
        }
    }

    #[inline]
    pub fn of(composite: &CanonicalType, field: impl Into<String>) -> Self {
        Self::new(composite.key(), field)
    }
}

impl fmt::Display for CompositeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.composite, self.field)
    }
}
