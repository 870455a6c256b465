//! Path formula construction: conjunction along an edge, disjunction at a
//! join point

use crate::context::EncoderContext;
use crate::errors::Result;
use crate::features::edge_translation::EdgeFormulaTranslator;
use crate::features::formula::Formula;
use crate::features::merge::MergeEngine;
use crate::features::path_formula::domain::PathFormula;
use crate::features::pointer_target_set::{base_ordering, PointerTargetSet};
use crate::features::ssa::SsaDifference;
use crate::shared::models::{CanonicalType, CfaEdge};
use im::OrdMap;
use tracing::debug;

pub struct PathFormulaManager<'a> {
    ctx: &'a EncoderContext,
}

impl<'a> PathFormulaManager<'a> {
    pub fn new(ctx: &'a EncoderContext) -> Self {
        Self { ctx }
    }

    #[inline]
    pub fn context(&self) -> &'a EncoderContext {
        self.ctx
    }

    pub fn make_empty(&self) -> PathFormula {
        PathFormula::empty()
    }

    pub fn make_and(&self, prior: &PathFormula, edge: &CfaEdge) -> Result<PathFormula> {
        EdgeFormulaTranslator::new(self.ctx).make_and(prior, edge)
    }

    /// Disjunction of two path formulas reaching the same control point
    ///
    /// Each branch is brought up to the merged SSA indices with equalities
    /// `x@hi == x@lo` (for memory functions: at every target of the type),
    /// and ordered after the bases only the other branch allocated.
    pub fn make_or(&self, a: &PathFormula, b: &PathFormula) -> PathFormula {
        let merged = MergeEngine::new(self.ctx).merge(a.pts(), b.pts());
        let (ssa, differences) = a.ssa().merge(b.ssa());
        debug!(
            differences = differences.len(),
            only_in_a = merged.only_in_a.len(),
            only_in_b = merged.only_in_b.len(),
            "joining path formulas"
        );

        let mut extra_a = Vec::new();
        let mut extra_b = Vec::new();
        for difference in &differences {
            let (lower, upper) = (difference.left.min(difference.right), difference.left.max(difference.right));
            let equality = self.reversioning(difference, lower, upper, &merged.snapshot);
            if difference.left < difference.right {
                extra_a.push(equality);
            } else {
                extra_b.push(equality);
            }
        }
        extra_a.push(self.ordering_after(a.pts(), &merged.only_in_b));
        extra_b.push(self.ordering_after(b.pts(), &merged.only_in_a));

        let branch_a = Formula::and(std::iter::once(a.formula().clone()).chain(extra_a));
        let branch_b = Formula::and(std::iter::once(b.formula().clone()).chain(extra_b));
        PathFormula::new(
            Formula::and2(Formula::or2(branch_a, branch_b), merged.formula),
            ssa,
            merged.snapshot,
            a.length().max(b.length()),
        )
    }

    /// `name@upper == name@lower`, for every target when `name` is a memory
    /// function
    fn reversioning(
        &self,
        difference: &SsaDifference,
        lower: u32,
        upper: u32,
        pts: &PointerTargetSet,
    ) -> Formula {
        let ty = &difference.ty;
        let sort = self.ctx.value_sort(ty);
        if difference.name == ty.uf_name() {
            Formula::and(pts.all_targets(ty).map(|target| {
                let address = target.address_formula(self.ctx);
                Formula::eq(
                    Formula::uf(difference.name.clone(), upper, sort, vec![address.clone()]),
                    Formula::uf(difference.name.clone(), lower, sort, vec![address]),
                )
            }))
        } else {
            Formula::eq(
                Formula::ssa_var(difference.name.clone(), upper, sort),
                Formula::ssa_var(difference.name.clone(), lower, sort),
            )
        }
    }

    /// Orderings chaining `bases` after the last base of `pts`
    fn ordering_after(&self, pts: &PointerTargetSet, bases: &OrdMap<String, CanonicalType>) -> Formula {
        let mut previous = pts
            .last_base()
            .map(|name| (name.to_string(), pts.base_type(name).map_or(0, |ty| self.ctx.size_of(ty))));
        let mut orderings = Vec::with_capacity(bases.len());
        for (name, ty) in bases.iter() {
            orderings.push(base_ordering(
                self.ctx,
                name,
                previous.as_ref().map(|(last, size)| (last.as_str(), *size)),
            ));
            previous = Some((name.clone(), self.ctx.size_of(ty)));
        }
        Formula::and(orderings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::formula::Sort;
    use crate::shared::models::{CDeclaration, CExpression, CStatement, CType, EdgeKind, Initializer};

    fn assign(name: &str, value: i128) -> CfaEdge {
        CfaEdge::new(
            "main",
            EdgeKind::Statement(CStatement::Assignment {
                lhs: CExpression::id(name, CType::int()),
                rhs: CExpression::int(value),
            }),
        )
    }

    fn int_var(name: &str, index: u32) -> Formula {
        Formula::ssa_var(name, index, Sort::BitVec(32))
    }

    #[test]
    fn test_or_reversions_lower_branch() {
        let ctx = EncoderContext::with_defaults();
        let manager = PathFormulaManager::new(&ctx);
        let start = manager.make_empty();
        let a = manager.make_and(&start, &assign("main::x", 1)).unwrap();
        let a = manager.make_and(&a, &assign("main::x", 2)).unwrap();
        let b = manager.make_and(&start, &assign("main::x", 3)).unwrap();

        let joined = manager.make_or(&a, &b);
        assert_eq!(joined.ssa().get_index("main::x"), 2);
        assert_eq!(joined.length(), 2);
        let branch_b = Formula::and2(b.formula().clone(), Formula::eq(int_var("main::x", 2), int_var("main::x", 1)));
        assert_eq!(joined.formula(), &Formula::or2(a.formula().clone(), branch_b));
    }

    #[test]
    fn test_or_of_equal_formulas_adds_nothing() {
        let ctx = EncoderContext::with_defaults();
        let manager = PathFormulaManager::new(&ctx);
        let a = manager.make_and(&manager.make_empty(), &assign("main::x", 1)).unwrap();
        let joined = manager.make_or(&a, &a);
        assert_eq!(joined.formula(), &Formula::or2(a.formula().clone(), a.formula().clone()));
        assert!(joined.pts().ptr_eq(a.pts()));
    }

    #[test]
    fn test_or_reversions_memory_at_every_target() {
        let ctx = EncoderContext::with_defaults().with_addressed_variables(["main::a", "main::b"]);
        let manager = PathFormulaManager::new(&ctx);
        let declare = |name: &str| {
            CfaEdge::new(
                "main",
                EdgeKind::Declaration(CDeclaration::Variable {
                    name: name.into(),
                    ty: CType::int(),
                    initializer: Some(Initializer::Expression(CExpression::int(0))),
                    is_global: false,
                }),
            )
        };
        let start = manager.make_and(&manager.make_empty(), &declare("main::a")).unwrap();
        let start = manager.make_and(&start, &declare("main::b")).unwrap();
        let write = CfaEdge::new(
            "main",
            EdgeKind::Statement(CStatement::Assignment {
                lhs: CExpression::id("main::a", CType::int()),
                rhs: CExpression::int(5),
            }),
        );
        let a = manager.make_and(&start, &write).unwrap();
        let joined = manager.make_or(&a, &start);
        assert_eq!(joined.ssa().get_index("*int"), 3);

        let sort = Sort::BitVec(32);
        let Some(branch_b) = joined.formula().conjuncts().into_iter().find_map(|c| match c.term() {
            crate::features::formula::Term::Or(items) => items.get(1).cloned(),
            _ => None,
        }) else {
            panic!("expected a disjunction");
        };
        for base in ["main::a", "main::b"] {
            let address = ctx.target_address(base, 0);
            assert!(branch_b.has_conjunct(&Formula::eq(
                Formula::uf("*int", 3, sort, vec![address.clone()]),
                Formula::uf("*int", 2, sort, vec![address]),
            )));
        }
    }

    #[test]
    fn test_or_orders_bases_of_other_branch() {
        let ctx = EncoderContext::with_defaults().with_addressed_variables(["main::a"]);
        let manager = PathFormulaManager::new(&ctx);
        let start = manager.make_empty();
        let declare = CfaEdge::new(
            "main",
            EdgeKind::Declaration(CDeclaration::Variable {
                name: "main::a".into(),
                ty: CType::int(),
                initializer: None,
                is_global: false,
            }),
        );
        let a = manager.make_and(&start, &declare).unwrap();
        let joined = manager.make_or(&a, &start);
        let fake = joined.pts().last_base().unwrap().to_string();
        assert!(joined.pts().is_prepared_base("main::a"));
        assert!(fake.starts_with(crate::features::merge::FAKE_ALLOCATION_PREFIX));
        let missing_in_b = base_ordering(&ctx, "main::a", None);
        let Some(branch_b) = joined.formula().conjuncts().into_iter().find_map(|c| match c.term() {
            crate::features::formula::Term::Or(items) => items.get(1).cloned(),
            _ => None,
        }) else {
            panic!("expected a disjunction");
        };
        assert_eq!(branch_b, missing_in_b);
    }
}
