//! End-to-end encoding scenarios
//!
//! Each test drives the public path-formula API over a short program
//! fragment and checks the heap bookkeeping and formula shape.

mod common;

use codegraph_memmodel::features::merge::UNITED_BASE_PREFIX;
use codegraph_memmodel::shared::models::{BinaryOp, CExpression, CType};
use codegraph_memmodel::{CanonicalType, EncoderConfig, EncoderContext, Formula, PathFormulaManager, Sort, Term};
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn scalar_assignment_is_a_plain_equality() {
    let ctx = EncoderContext::with_defaults();
    let manager = PathFormulaManager::new(&ctx);
    let pf = run(&manager, &manager.make_empty(), &[assign(int_var("x"), CExpression::int(5))]);

    assert_eq!(pf.formula(), &Formula::eq(ssa_int("x", 1), Formula::bv(5, 32)));
    assert_eq!(pf.ssa().get_index(&local("x")), 1);
    assert!(pf.pts().bases().is_empty());
}

#[test]
fn branches_over_scalars_join_at_highest_index() {
    let ctx = EncoderContext::with_defaults();
    let manager = PathFormulaManager::new(&ctx);
    let start = run(&manager, &manager.make_empty(), &[assign(int_var("x"), CExpression::int(0))]);
    let positive = CExpression::binary(BinaryOp::Gt, int_var("x"), CExpression::int(0), int());

    let then = run(
        &manager,
        &start,
        &[assume(positive.clone(), true), assign(int_var("x"), CExpression::int(1))],
    );
    let otherwise = run(&manager, &start, &[assume(positive, false)]);
    let joined = manager.make_or(&then, &otherwise);

    assert_eq!(joined.ssa().get_index(&local("x")), 2);
    assert_eq!(joined.length(), then.length().max(otherwise.length()));
    let Term::Or(branches) = joined.formula().term() else {
        panic!("expected a disjunction, got {}", joined.formula());
    };
    assert!(branches[1].has_conjunct(&Formula::eq(ssa_int("x", 2), ssa_int("x", 1))));
}

#[test]
fn malloc_is_typed_by_first_write() {
    let ctx = EncoderContext::with_defaults();
    let manager = PathFormulaManager::new(&ctx);
    let p = var("p", void_ptr());
    let pf = run(
        &manager,
        &manager.make_empty(),
        &[call_assign(p.clone(), "malloc", vec![CExpression::int(16)])],
    );
    assert!(pf.pts().is_deferred_allocation_pointer(&local("p")));
    assert!(pf.pts().is_prepared_base("__alloc_0"));

    let cell = CExpression::deref(CExpression::cast(p, int_ptr()), int());
    let pf = run(&manager, &pf, &[assign(cell, CExpression::int(9))]);

    let element = CanonicalType::int();
    assert_eq!(pf.pts().base_type("__alloc_0"), Some(&element.array_of(Some(4))));
    assert_eq!(pf.pts().target_count(&element), 4);
    assert!(pf.pts().deferred_allocations().is_empty());
}

#[test]
fn calloc_reveal_zero_fills_the_block() {
    let ctx = EncoderContext::with_defaults();
    let manager = PathFormulaManager::new(&ctx);
    let p = var("p", int_ptr());
    let write = CExpression::subscript(p.clone(), CExpression::int(1), int());
    let pf = run(
        &manager,
        &manager.make_empty(),
        &[
            call_assign(p, "calloc", vec![CExpression::int(2), CExpression::int(4)]),
            assign(write, CExpression::int(5)),
        ],
    );

    let element = CanonicalType::int();
    assert_eq!(pf.pts().base_type("__alloc_0"), Some(&element.array_of(Some(2))));
    assert_eq!(pf.pts().target_count(&element), 2);
    assert!(pf.ssa().get_index("*int") >= 2);
}

#[test]
fn failing_allocations_guard_the_address() {
    let config = EncoderConfig::default().allocations_always_succeed(false);
    let ctx = EncoderContext::new(config).unwrap();
    let manager = PathFormulaManager::new(&ctx);
    let pf = run(
        &manager,
        &manager.make_empty(),
        &[call_assign(var("p", void_ptr()), "malloc", vec![CExpression::int(4)])],
    );

    let value = Formula::ite(
        Formula::var("__alloc_0_succeeded", Sort::Bool),
        ctx.base_address("__alloc_0"),
        ctx.offset(0),
    );
    let p = Formula::ssa_var(local("p"), 1, ctx.pointer_sort());
    assert!(pf.formula().has_conjunct(&Formula::eq(p, value)));
}

#[test]
fn struct_fields_written_on_two_branches_are_both_tracked() {
    let ctx = EncoderContext::with_defaults().with_addressed_variables([local("s")]);
    let manager = PathFormulaManager::new(&ctx);
    let pair_ty = canonical(&ctx, &pair());
    let start = run(&manager, &manager.make_empty(), &[declare("s", pair(), None)]);
    assert!(start.pts().is_actual_base(&local("s")));
    assert_eq!(start.pts().target_count(&CanonicalType::int()), 0);

    let field = |name: &str| CExpression::field(var("s", pair()), name, int());
    let a = run(
        &manager,
        &start,
        &[assign(field("a"), CExpression::int(1)), assign(field("a"), CExpression::int(3))],
    );
    let b = run(&manager, &start, &[assign(field("b"), CExpression::int(2))]);
    assert!(a.pts().tracks_field(&pair_ty, "a"));
    assert!(!a.pts().tracks_field(&pair_ty, "b"));
    assert_eq!(a.ssa().get_index("*int"), 2);
    assert_eq!(b.ssa().get_index("*int"), 1);

    let joined = manager.make_or(&a, &b);
    assert!(joined.pts().tracks_field(&pair_ty, "a"));
    assert!(joined.pts().tracks_field(&pair_ty, "b"));
    assert_eq!(joined.pts().target_count(&CanonicalType::int()), 2);
    assert_eq!(joined.pts().last_base(), start.pts().last_base());
    assert_eq!(joined.ssa().get_index("*int"), 2);

    // Only the branch that stopped at the lower version is brought up to
    // the merged one, at both fields
    let sort = Sort::BitVec(32);
    let s = local("s");
    let reversion = |offset: u64| {
        let at = vec![ctx.target_address(&s, offset)];
        Formula::eq(Formula::uf("*int", 2, sort, at.clone()), Formula::uf("*int", 1, sort, at))
    };
    let branches = join_branches(&joined);
    assert_eq!(branches.len(), 2);
    for offset in [0, 4] {
        assert!(branches[1].has_conjunct(&reversion(offset)));
        assert!(!branches[0].has_conjunct(&reversion(offset)));
    }

    let read = run(
        &manager,
        &joined,
        &[assign(int_var("x"), field("a")), assign(int_var("y"), field("b"))],
    );
    assert!(read.formula().has_conjunct(&Formula::eq(
        ssa_int("x", 1),
        Formula::uf("*int", 2, sort, vec![ctx.target_address(&s, 0)])
    )));
    assert!(read.formula().has_conjunct(&Formula::eq(
        ssa_int("y", 1),
        Formula::uf("*int", 2, sort, vec![ctx.target_address(&s, 4)])
    )));
    assert_eq!(read.ssa().get_index("*int"), 2);
}

#[test]
fn array_list_initializer_writes_each_cell_once() {
    let ctx = EncoderContext::with_defaults().with_addressed_variables([local("a")]);
    let manager = PathFormulaManager::new(&ctx);
    let items = (1..=3).map(CExpression::int).collect();
    let pf = run(
        &manager,
        &manager.make_empty(),
        &[declare_list("a", CType::array_of(int(), Some(3)), items)],
    );

    let a = local("a");
    let sort = Sort::BitVec(32);
    let cell = |i: u64, index: u32| Formula::uf("*int", index, sort, vec![ctx.target_address(&a, 4 * i)]);
    for i in 0..3u64 {
        assert!(pf
            .formula()
            .has_conjunct(&Formula::eq(cell(i, 1), Formula::bv(i as i128 + 1, 32))));
        // the write covers the whole base, nothing of it is retained
        assert!(!pf.formula().has_conjunct(&Formula::eq(cell(i, 1), cell(i, 0))));
    }
    let writes = pf
        .formula()
        .conjuncts()
        .into_iter()
        .filter(|c| matches!(c.term(), Term::Eq(lhs, _) if matches!(lhs.term(), Term::Uf { .. })))
        .count();
    assert_eq!(writes, 3);
    assert_eq!(pf.ssa().get_index("*int"), 1);
    assert_eq!(pf.pts().target_count(&CanonicalType::int()), 3);
}

#[test]
fn allocation_revealed_differently_on_two_branches_becomes_a_union() {
    let ctx = EncoderContext::with_defaults();
    let manager = PathFormulaManager::new(&ctx);
    let p = var("p", void_ptr());
    let start = run(
        &manager,
        &manager.make_empty(),
        &[call_assign(p.clone(), "malloc", vec![CExpression::int(4)])],
    );

    let as_int = CExpression::deref(CExpression::cast(p.clone(), int_ptr()), int());
    let as_char = CExpression::deref(
        CExpression::cast(p, CType::pointer_to(CType::char())),
        CType::char(),
    );
    let a = run(&manager, &start, &[assign(as_int, CExpression::int(1))]);
    let b = run(&manager, &start, &[assign(as_char, CExpression::literal(99, CType::char()))]);
    assert_eq!(a.pts().base_type("__alloc_0"), Some(&CanonicalType::int()));
    assert_eq!(
        b.pts().base_type("__alloc_0"),
        Some(&CanonicalType::char().array_of(Some(4)))
    );

    let joined = manager.make_or(&a, &b);
    let Some(united) = joined.pts().base_type("__alloc_0") else {
        panic!("allocation base lost in the join");
    };
    assert!(united.is_composite());
    assert!(united.key().contains(UNITED_BASE_PREFIX));
    assert!(joined.pts().target_count(&CanonicalType::int()) >= 1);
    assert!(joined.pts().target_count(&CanonicalType::char()) >= 4);

    let swapped = manager.make_or(&b, &a);
    assert_eq!(swapped.pts().base_type("__alloc_0"), Some(united));
}

#[test]
fn write_through_pointer_updates_pointed_variable() {
    let ctx = EncoderContext::with_defaults().with_addressed_variables([local("a")]);
    let manager = PathFormulaManager::new(&ctx);
    let pf = run(
        &manager,
        &manager.make_empty(),
        &[
            declare("a", int(), Some(CExpression::int(0))),
            declare("p", int_ptr(), Some(CExpression::address_of(int_var("a")))),
            assign(CExpression::deref(var("p", int_ptr()), int()), CExpression::int(7)),
            assign(int_var("x"), int_var("a")),
        ],
    );

    let sort = Sort::BitVec(32);
    let p = Formula::ssa_var(local("p"), 1, ctx.pointer_sort());
    assert!(pf
        .formula()
        .has_conjunct(&Formula::eq(p.clone(), ctx.base_address(&local("a")))));
    assert!(pf
        .formula()
        .has_conjunct(&Formula::eq(Formula::uf("*int", 2, sort, vec![p]), Formula::bv(7, 32))));
    assert!(pf.formula().has_conjunct(&Formula::eq(
        ssa_int("x", 1),
        Formula::uf("*int", 2, sort, vec![ctx.base_address(&local("a"))])
    )));
    assert_eq!(pf.pts().target_count(&CanonicalType::int()), 1);
}
