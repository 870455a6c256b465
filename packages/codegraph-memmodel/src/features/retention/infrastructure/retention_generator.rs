//! Retention constraint generation
//!
//! Given the pattern of a write, decide for every tracked target whether it
//! certainly, possibly or certainly not changes.
//!
//! A scalar write at address `w`:
//!
//! | pattern    | matching target                   | other target       |
//! |------------|-----------------------------------|--------------------|
//! | exact      | (written)                         | `new(t) == old(t)` |
//! | semiexact  | `addr(t) == w ∨ new(t) == old(t)` | `new(t) == old(t)` |
//! | inexact    | `addr(t) == w ∨ new(t) == old(t)` | (every target matches) |
//!
//! A write of `size` bytes starting at `start`:
//!
//! | pattern    | constraint                                                             |
//! |------------|------------------------------------------------------------------------|
//! | exact      | `new(t) == old(t)` for every `t` outside `[start, start + size)`        |
//! | semiexact  | per candidate cell `c` of the base: `addr(c) != start ∨ kept(c)`, where `kept(c)` retains every `t` outside `[c, c + size)` |
//! | inexact    | `start <= addr(t) <= start + size ∨ new(t) == old(t)` for every `t`     |
//!
//! A semiexact aggregate write with no candidate cell falls back to the
//! inexact form. The inexact bound is inclusive at `start + size`.

use crate::context::EncoderContext;
use crate::features::formula::{Constraints, Formula};
use crate::features::pointer_target::{PointerTarget, PointerTargetPattern, Precision};
use crate::features::pointer_target_set::PointerTargetSet;
use crate::features::ssa::SsaMapBuilder;
use crate::shared::models::CanonicalType;
use tracing::warn;

pub struct RetentionConstraintGenerator<'a> {
    ctx: &'a EncoderContext,
}

impl<'a> RetentionConstraintGenerator<'a> {
    pub fn new(ctx: &'a EncoderContext) -> Self {
        Self { ctx }
    }

    /// `UF_ty@new(t) == UF_ty@old(t)` where `new` is the version the pending
    /// write will produce
    fn retained(&self, ty: &CanonicalType, ssa: &SsaMapBuilder, target: &PointerTarget) -> Formula {
        let name = ty.uf_name();
        let old = ssa.get_index(&name);
        let sort = self.ctx.value_sort(ty);
        let address = target.address_formula(self.ctx);
        Formula::eq(
            Formula::uf(name.clone(), old + 1, sort, vec![address.clone()]),
            Formula::uf(name, old, sort, vec![address]),
        )
    }

    fn within_cap(&self, pts: &PointerTargetSet, ty: &CanonicalType) -> bool {
        match self.ctx.config().max_retention_targets {
            Some(cap) if pts.target_count(ty) > cap => {
                warn!(
                    ty = %ty,
                    targets = pts.target_count(ty),
                    cap,
                    "retention skipped, write leaves cells of this type unconstrained"
                );
                false
            }
            _ => true,
        }
    }

    /// Frame constraints for a write of one `ty` cell at `lvalue`
    pub fn scalar_write(
        &self,
        pts: &PointerTargetSet,
        ty: &CanonicalType,
        pattern: &PointerTargetPattern,
        lvalue: &Formula,
        ssa: &SsaMapBuilder,
        constraints: &mut Constraints,
    ) {
        if !self.within_cap(pts, ty) {
            return;
        }
        let exact = pattern.is_exact();
        for target in pts.all_targets(ty) {
            if !pattern.matches(target) {
                constraints.add(self.retained(ty, ssa, target));
            } else if !exact {
                constraints.add(Formula::or2(
                    Formula::eq(target.address_formula(self.ctx), lvalue.clone()),
                    self.retained(ty, ssa, target),
                ));
            }
        }
    }

    /// Frame constraints for a write of `size` bytes starting at `start`
    ///
    /// `types` lists every cell type the write produced a new version of;
    /// `first_leaf` is the type of the first scalar in the written object.
    #[allow(clippy::too_many_arguments)]
    pub fn aggregate_write(
        &self,
        pts: &PointerTargetSet,
        pattern: &PointerTargetPattern,
        first_leaf: &CanonicalType,
        start: &Formula,
        size: u64,
        types: &[CanonicalType],
        ssa: &SsaMapBuilder,
        constraints: &mut Constraints,
    ) {
        match pattern.precision() {
            Precision::Exact => self.exact_range(pts, pattern, size, types, ssa, constraints),
            Precision::Semiexact => {
                let candidates: Vec<&PointerTarget> =
                    pts.matching_targets(first_leaf, pattern).collect();
                if candidates.is_empty() {
                    self.inexact_range(pts, start, size, types, ssa, constraints);
                } else {
                    self.semiexact_range(pts, &candidates, start, size, types, ssa, constraints);
                }
            }
            Precision::Inexact => self.inexact_range(pts, start, size, types, ssa, constraints),
        }
    }

    fn exact_range(
        &self,
        pts: &PointerTargetSet,
        pattern: &PointerTargetPattern,
        size: u64,
        types: &[CanonicalType],
        ssa: &SsaMapBuilder,
        constraints: &mut Constraints,
    ) {
        let mut range = pattern.clone();
        range.set_range(size);
        for ty in types.iter().filter(|ty| self.within_cap(pts, ty)) {
            for target in pts.spurious_targets(ty, &range) {
                constraints.add(self.retained(ty, ssa, target));
            }
        }
    }

    /// One case split per candidate start cell: either the write does not
    /// start there, or everything outside the range it would cover is kept
    #[allow(clippy::too_many_arguments)]
    fn semiexact_range(
        &self,
        pts: &PointerTargetSet,
        candidates: &[&PointerTarget],
        start: &Formula,
        size: u64,
        types: &[CanonicalType],
        ssa: &SsaMapBuilder,
        constraints: &mut Constraints,
    ) {
        let types: Vec<&CanonicalType> = types.iter().filter(|ty| self.within_cap(pts, ty)).collect();
        for candidate in candidates {
            let covered = PointerTargetPattern::with_range(&candidate.base, candidate.offset(), size);
            let kept = Formula::and(types.iter().flat_map(|ty| {
                pts.spurious_targets(ty, &covered)
                    .map(|target| self.retained(ty, ssa, target))
                    .collect::<Vec<_>>()
            }));
            constraints.add(Formula::or2(
                Formula::not(Formula::eq(candidate.address_formula(self.ctx), start.clone())),
                kept,
            ));
        }
    }

    fn inexact_range(
        &self,
        pts: &PointerTargetSet,
        start: &Formula,
        size: u64,
        types: &[CanonicalType],
        ssa: &SsaMapBuilder,
        constraints: &mut Constraints,
    ) {
        let end = Formula::add(start.clone(), self.ctx.offset(size));
        for ty in types.iter().filter(|ty| self.within_cap(pts, ty)) {
            for target in pts.all_targets(ty) {
                let address = target.address_formula(self.ctx);
                let inside = Formula::and2(
                    Formula::le(start.clone(), address.clone(), false),
                    Formula::le(address, end.clone(), false),
                );
                constraints.add(Formula::or2(inside, self.retained(ty, ssa, target)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use crate::features::ssa::SsaMap;

    fn setup(ctx: &EncoderContext) -> PointerTargetSet {
        let mut b = PointerTargetSet::empty().builder(ctx);
        b.add_base("x", &CanonicalType::int());
        b.add_base("y", &CanonicalType::int());
        b.add_base("a", &CanonicalType::int().array_of(Some(2)));
        b.build()
    }

    fn retained(ctx: &EncoderContext, base: &str, offset: u64, old: u32) -> Formula {
        let sort = ctx.value_sort(&CanonicalType::int());
        let address = ctx.target_address(base, offset);
        Formula::eq(
            Formula::uf("*int", old + 1, sort, vec![address.clone()]),
            Formula::uf("*int", old, sort, vec![address]),
        )
    }

    #[test]
    fn test_exact_scalar_write_retains_everything_else() {
        let ctx = EncoderContext::with_defaults();
        let pts = setup(&ctx);
        let ssa = SsaMap::empty().builder();
        let mut constraints = Constraints::new();
        let pattern = PointerTargetPattern::exact("x", None, 0, 0);
        RetentionConstraintGenerator::new(&ctx).scalar_write(
            &pts,
            &CanonicalType::int(),
            &pattern,
            &ctx.base_address("x"),
            &ssa,
            &mut constraints,
        );
        assert_eq!(constraints.len(), 3);
        let all = constraints.into_formula();
        assert!(all.has_conjunct(&retained(&ctx, "y", 0, 0)));
        assert!(all.has_conjunct(&retained(&ctx, "a", 4, 0)));
        assert!(!all.has_conjunct(&retained(&ctx, "x", 0, 0)));
    }

    #[test]
    fn test_inexact_scalar_write_is_conditional() {
        let ctx = EncoderContext::with_defaults();
        let pts = setup(&ctx);
        let ssa = SsaMap::empty().builder();
        let mut constraints = Constraints::new();
        let p = Formula::ssa_var("main::p", 1, ctx.pointer_sort());
        RetentionConstraintGenerator::new(&ctx).scalar_write(
            &pts,
            &CanonicalType::int(),
            &PointerTargetPattern::any(),
            &p,
            &ssa,
            &mut constraints,
        );
        assert_eq!(constraints.len(), 4);
        let expected = Formula::or2(
            Formula::eq(ctx.base_address("y"), p.clone()),
            retained(&ctx, "y", 0, 0),
        );
        assert!(constraints.iter().any(|c| *c == expected));
    }

    #[test]
    fn test_exact_aggregate_write_spares_its_range() {
        let ctx = EncoderContext::with_defaults();
        let pts = setup(&ctx);
        let ssa = SsaMap::empty().builder();
        let mut constraints = Constraints::new();
        let int = CanonicalType::int();
        RetentionConstraintGenerator::new(&ctx).aggregate_write(
            &pts,
            &PointerTargetPattern::exact("a", None, 0, 0),
            &int,
            &ctx.base_address("a"),
            8,
            &[int.clone()],
            &ssa,
            &mut constraints,
        );
        let all = constraints.into_formula();
        assert!(all.has_conjunct(&retained(&ctx, "x", 0, 0)));
        assert!(all.has_conjunct(&retained(&ctx, "y", 0, 0)));
        assert!(!all.has_conjunct(&retained(&ctx, "a", 0, 0)));
        assert!(!all.has_conjunct(&retained(&ctx, "a", 4, 0)));
    }

    #[test]
    fn test_semiexact_aggregate_write_splits_on_start() {
        let ctx = EncoderContext::with_defaults();
        let pts = setup(&ctx);
        let ssa = SsaMap::empty().builder();
        let mut constraints = Constraints::new();
        let int = CanonicalType::int();
        let start = Formula::ssa_var("w", 1, ctx.pointer_sort());
        RetentionConstraintGenerator::new(&ctx).aggregate_write(
            &pts,
            &PointerTargetPattern::for_base("a"),
            &int,
            &start,
            4,
            &[int.clone()],
            &ssa,
            &mut constraints,
        );
        // one split per cell of `a`
        assert_eq!(constraints.len(), 2);
    }

    #[test]
    fn test_retention_cap_skips_large_types() {
        let config = EncoderConfig::default().max_retention_targets(Some(2));
        let ctx = EncoderContext::new(config).unwrap();
        let pts = setup(&ctx);
        let ssa = SsaMap::empty().builder();
        let mut constraints = Constraints::new();
        RetentionConstraintGenerator::new(&ctx).scalar_write(
            &pts,
            &CanonicalType::int(),
            &PointerTargetPattern::exact("x", None, 0, 0),
            &ctx.base_address("x"),
            &ssa,
            &mut constraints,
        );
        assert!(constraints.is_empty());
    }
}
