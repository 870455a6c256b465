//! Addressable memory cells

use crate::context::EncoderContext;
use crate::features::formula::Formula;
use crate::shared::models::CanonicalType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One scalar cell reachable from a base at a statically known offset
///
/// `container_type` is the innermost array or composite holding the cell,
/// `None` for a base that is itself scalar. `container_offset` is the offset
/// of that container from the base, `proper_offset` the offset of the cell
/// inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerTarget {
    pub base: String,
    pub container_type: Option<CanonicalType>,
    pub proper_offset: u64,
    pub container_offset: u64,
}

impl PointerTarget {
    #[inline]
    pub fn new(
        base: impl Into<String>,
        container_type: Option<CanonicalType>,
        proper_offset: u64,
        container_offset: u64,
    ) -> Self {
        Self {
            base: base.into(),
            container_type,
            proper_offset,
            container_offset,
        }
    }

    /// Offset of the cell from the start of its base
    #[inline]
    pub fn offset(&self) -> u64 {
        self.container_offset + self.proper_offset
    }

    pub fn address_formula(&self, ctx: &EncoderContext) -> Formula {
        ctx.target_address(&self.base, self.offset())
    }
}

impl fmt::Display for PointerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.base, self.offset())
    }
}
