//! Pointer target patterns
//!
//! A pattern describes which tracked targets a write may touch. Unknown
//! components are wildcards:
//! - **Exact**: base and both offsets known, a single address
//! - **Semiexact**: base known, offset within it unknown
//! - **Inexact**: base unknown, the address may alias anything of the type
//!
//! An exact pattern can be widened to a byte range inside its base with
//! [`PointerTargetPattern::set_range`], which is how a whole-aggregate write
//! is matched against the cells it covers.

use super::pointer_target::PointerTarget;
use crate::shared::models::CanonicalType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    Exact,
    Semiexact,
    Inexact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PointerTargetPattern {
    base: Option<String>,
    container_type: Option<CanonicalType>,
    proper_offset: Option<u64>,
    container_offset: Option<u64>,
    /// `[start, end)` byte offsets inside `base`
    range: Option<(u64, u64)>,
}

impl PointerTargetPattern {
    /// Pattern matching every target
    #[inline]
    pub fn any() -> Self {
        Self::default()
    }

    /// Pattern matching every target of one base
    #[inline]
    pub fn for_base(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::default()
        }
    }

    /// Pattern matching the single cell at `container_offset + proper_offset`
    #[inline]
    pub fn exact(
        base: impl Into<String>,
        container_type: Option<CanonicalType>,
        container_offset: u64,
        proper_offset: u64,
    ) -> Self {
        Self {
            base: Some(base.into()),
            container_type,
            proper_offset: Some(proper_offset),
            container_offset: Some(container_offset),
            range: None,
        }
    }

    /// Pattern matching the cells of `base` within `[start, start + size)`
    #[inline]
    pub fn with_range(base: impl Into<String>, start: u64, size: u64) -> Self {
        Self {
            base: Some(base.into()),
            range: Some((start, start + size)),
            ..Self::default()
        }
    }

    pub fn precision(&self) -> Precision {
        match (&self.base, self.container_offset, self.proper_offset) {
            (Some(_), Some(_), Some(_)) => Precision::Exact,
            (Some(_), _, _) => Precision::Semiexact,
            (None, _, _) => Precision::Inexact,
        }
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.precision() == Precision::Exact
    }

    #[inline]
    pub fn is_semiexact(&self) -> bool {
        self.precision() == Precision::Semiexact
    }

    #[inline]
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    #[inline]
    pub fn container_type(&self) -> Option<&CanonicalType> {
        self.container_type.as_ref()
    }

    #[inline]
    pub fn container_offset(&self) -> Option<u64> {
        self.container_offset
    }

    #[inline]
    pub fn proper_offset(&self) -> Option<u64> {
        self.proper_offset
    }

    #[inline]
    pub fn range(&self) -> Option<(u64, u64)> {
        self.range
    }

    /// Offset of the addressed cell inside its base, when known
    pub fn offset(&self) -> Option<u64> {
        Some(self.container_offset? + self.proper_offset?)
    }

    pub fn set_base(&mut self, base: Option<String>) {
        self.base = base;
    }

    pub fn set_container_type(&mut self, ty: Option<CanonicalType>) {
        self.container_type = ty;
    }

    pub fn set_container_offset(&mut self, offset: Option<u64>) {
        self.container_offset = offset;
    }

    pub fn set_proper_offset(&mut self, offset: Option<u64>) {
        self.proper_offset = offset;
    }

    /// Widen an exact pattern to the `size` bytes starting at its address
    pub fn set_range(&mut self, size: u64) {
        debug_assert!(self.is_exact(), "only exact patterns can be widened");
        if let Some(start) = self.offset() {
            self.range = Some((start, start + size));
        }
    }

    pub fn matches(&self, target: &PointerTarget) -> bool {
        if let Some(base) = &self.base {
            if *base != target.base {
                return false;
            }
        }
        if let Some((start, end)) = self.range {
            let offset = target.offset();
            return start <= offset && offset < end;
        }
        if let Some(ty) = &self.container_type {
            if target.container_type.as_ref() != Some(ty) {
                return false;
            }
        }
        self.proper_offset.map_or(true, |o| o == target.proper_offset)
            && self
                .container_offset
                .map_or(true, |o| o == target.container_offset)
    }
}

impl fmt::Display for PointerTargetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.base.as_deref().unwrap_or("*");
        if let Some((start, end)) = self.range {
            return write!(f, "{}[{}..{})", base, start, end);
        }
        let show = |o: Option<u64>| o.map_or_else(|| "?".to_string(), |o| o.to_string());
        write!(
            f,
            "{}+{}+{}",
            base,
            show(self.container_offset),
            show(self.proper_offset)
        )
    }
}
