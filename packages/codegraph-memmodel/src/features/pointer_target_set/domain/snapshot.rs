//! Immutable pointer-target-set snapshot
//!
//! All collections are persistent (`im`), so deriving a builder from a
//! snapshot and building it back is O(1) until something is modified, and
//! unmodified parts stay physically shared between snapshots.

use super::composite_field::CompositeField;
use super::deferred_allocation::DeferredAllocationPool;
use crate::context::EncoderContext;
use crate::features::formula::Formula;
use crate::features::pointer_target::{PointerTarget, PointerTargetPattern};
use crate::features::pointer_target_set::application::PointerTargetSetBuilder;
use crate::shared::models::CanonicalType;
use im::{OrdMap, OrdSet, Vector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prepared bases carry a placeholder `void[n]` type until revealed
#[inline]
pub fn is_fake_base_type(ty: &CanonicalType) -> bool {
    matches!(ty.array_element(), Some((element, _)) if element.is_void())
}

/// Address ordering placing `new_base` after `last` (name and byte size)
///
/// With no previous base the new address only has to be positive.
pub fn base_ordering(ctx: &EncoderContext, new_base: &str, last: Option<(&str, u64)>) -> Formula {
    let address = ctx.base_address(new_base);
    match last {
        None => Formula::gt(address, ctx.offset(0), true),
        Some((last, size)) => {
            let end = Formula::add(ctx.base_address(last), ctx.offset(size));
            Formula::and2(
                Formula::gt(end.clone(), ctx.offset(0), true),
                Formula::gt(address, end, true),
            )
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerTargetSet {
    pub(crate) bases: OrdMap<String, CanonicalType>,
    pub(crate) last_base: Option<String>,
    pub(crate) fields: OrdSet<CompositeField>,
    pub(crate) deferred_allocations: OrdMap<String, Arc<DeferredAllocationPool>>,
    pub(crate) targets: OrdMap<CanonicalType, Vector<PointerTarget>>,
}

impl PointerTargetSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder<'a>(&self, ctx: &'a EncoderContext) -> PointerTargetSetBuilder<'a> {
        PointerTargetSetBuilder::new(ctx, self)
    }

    #[inline]
    pub fn bases(&self) -> &OrdMap<String, CanonicalType> {
        &self.bases
    }

    #[inline]
    pub fn base_type(&self, name: &str) -> Option<&CanonicalType> {
        self.bases.get(name)
    }

    #[inline]
    pub fn last_base(&self) -> Option<&str> {
        self.last_base.as_deref()
    }

    #[inline]
    pub fn fields(&self) -> &OrdSet<CompositeField> {
        &self.fields
    }

    #[inline]
    pub fn deferred_allocations(&self) -> &OrdMap<String, Arc<DeferredAllocationPool>> {
        &self.deferred_allocations
    }

    #[inline]
    pub fn targets(&self) -> &OrdMap<CanonicalType, Vector<PointerTarget>> {
        &self.targets
    }

    /// A base with a real type
    pub fn is_actual_base(&self, name: &str) -> bool {
        self.bases.get(name).is_some_and(|ty| !is_fake_base_type(ty))
    }

    /// A base that has at least reserved an address slot
    #[inline]
    pub fn is_prepared_base(&self, name: &str) -> bool {
        self.bases.contains_key(name)
    }

    pub fn is_base(&self, name: &str, ty: &CanonicalType) -> bool {
        self.bases.get(name) == Some(ty)
    }

    pub fn tracks_field(&self, composite: &CanonicalType, field: &str) -> bool {
        self.fields.contains(&CompositeField::of(composite, field))
    }

    pub fn all_targets<'s>(&'s self, ty: &CanonicalType) -> impl Iterator<Item = &'s PointerTarget> + 's {
        self.targets.get(ty).into_iter().flat_map(|v| v.iter())
    }

    pub fn target_count(&self, ty: &CanonicalType) -> usize {
        self.targets.get(ty).map_or(0, Vector::len)
    }

    pub fn matching_targets<'s>(
        &'s self,
        ty: &CanonicalType,
        pattern: &'s PointerTargetPattern,
    ) -> impl Iterator<Item = &'s PointerTarget> + 's {
        self.all_targets(ty).filter(move |t| pattern.matches(t))
    }

    pub fn spurious_targets<'s>(
        &'s self,
        ty: &CanonicalType,
        pattern: &'s PointerTargetPattern,
    ) -> impl Iterator<Item = &'s PointerTarget> + 's {
        self.all_targets(ty).filter(move |t| !pattern.matches(t))
    }

    #[inline]
    pub fn is_deferred_allocation_pointer(&self, name: &str) -> bool {
        self.deferred_allocations.contains_key(name)
    }

    /// A pool registered under its own base name, not aliased by any variable
    pub fn is_temporary_deferred_allocation_pointer(&self, name: &str) -> bool {
        self.deferred_allocations
            .get(name)
            .is_some_and(|pool| pool.base_variables().contains(&name.to_string()))
    }

    pub fn deferred_allocation(&self, pointer: &str) -> Option<&Arc<DeferredAllocationPool>> {
        self.deferred_allocations.get(pointer)
    }

    /// Ordering constraint placing `new_base` after `last_base`
    pub fn next_base_address_inequality(
        &self,
        ctx: &EncoderContext,
        new_base: &str,
        last_base: Option<&str>,
    ) -> Formula {
        let last = last_base.map(|name| {
            let size = self.bases.get(name).map_or(0, |ty| ctx.size_of(ty));
            (name, size)
        });
        base_ordering(ctx, new_base, last)
    }

    /// Conjoin `formula` with orderings for every still-pending allocation
    ///
    /// Pending bases are chained after the last base, each one sized by its
    /// pool or by the configured default.
    pub fn force_disjointness_constraints(&self, ctx: &EncoderContext, formula: Formula) -> Formula {
        let mut seen: Vec<&str> = Vec::new();
        let mut pending: Vec<(&str, u64)> = Vec::new();
        for pool in self.deferred_allocations.values() {
            let size = pool.size().unwrap_or(ctx.config().default_allocation_size);
            for base in pool.base_variables().iter() {
                if !self.is_prepared_base(base) && !seen.contains(&base.as_str()) {
                    seen.push(base.as_str());
                    pending.push((base.as_str(), size));
                }
            }
        }
        if pending.is_empty() {
            return formula;
        }

        let mut previous = self
            .last_base
            .as_deref()
            .map(|name| (name, self.bases.get(name).map_or(0, |ty| ctx.size_of(ty))));
        let mut conjuncts = vec![formula];
        for (base, size) in pending {
            conjuncts.push(base_ordering(ctx, base, previous));
            previous = Some((base, size));
        }
        Formula::and(conjuncts)
    }

    /// True when every collection is the same physical object
    pub fn ptr_eq(&self, other: &PointerTargetSet) -> bool {
        self.bases.ptr_eq(&other.bases)
            && self.fields.ptr_eq(&other.fields)
            && self.deferred_allocations.ptr_eq(&other.deferred_allocations)
            && self.targets.ptr_eq(&other.targets)
            && self.last_base == other.last_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let pts = PointerTargetSet::empty();
        assert!(pts.bases().is_empty());
        assert_eq!(pts.last_base(), None);
        assert_eq!(pts.target_count(&CanonicalType::int()), 0);
        assert!(!pts.is_deferred_allocation_pointer("main::p"));
    }

    #[test]
    fn test_fake_base_type() {
        assert!(is_fake_base_type(&CanonicalType::fake_base(8)));
        assert!(!is_fake_base_type(&CanonicalType::int().array_of(Some(2))));
        assert!(!is_fake_base_type(&CanonicalType::int()));
    }

    #[test]
    fn test_first_base_only_needs_positive_address() {
        let ctx = EncoderContext::with_defaults();
        let pts = PointerTargetSet::empty();
        let f = pts.next_base_address_inequality(&ctx, "x", None);
        assert_eq!(f, Formula::gt(ctx.base_address("x"), ctx.offset(0), true));
    }

    #[test]
    fn test_force_disjointness_without_pending_is_identity() {
        let ctx = EncoderContext::with_defaults();
        let pts = PointerTargetSet::empty();
        let f = Formula::var("b", crate::features::formula::Sort::Bool);
        assert_eq!(pts.force_disjointness_constraints(&ctx, f.clone()), f);
    }
}
