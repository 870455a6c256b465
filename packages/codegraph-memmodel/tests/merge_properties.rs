//! Property-based tests for snapshot merging
//!
//! Invariants that should hold for ALL pairs of diverging snapshots:
//! - Commutativity: merge(a, b) and merge(b, a) agree on bases, fields
//!   and deferred pools, and list the targets in the same order
//! - Coverage: every base and tracked field of either side survives
//! - Sharing: merging a snapshot with itself returns it unchanged

mod common;

use codegraph_memmodel::features::merge::FAKE_ALLOCATION_PREFIX;
use codegraph_memmodel::{
    CanonicalType, EncoderContext, MergeEngine, PointerTargetSet, PointerTargetSetBuilder,
};
use common::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
enum Op {
    AddBase { base: usize, ty: usize },
    AddField { field: usize },
    Allocate { pointer: usize, allocation: usize, zeroing: bool, size: Option<u64> },
    Alias { pointer: usize, original: usize },
    Release { pointer: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..5usize).prop_map(|(base, ty)| Op::AddBase { base, ty }),
        (0..2usize).prop_map(|field| Op::AddField { field }),
        (0..4usize, 0..3usize, any::<bool>(), prop::option::of(1..32u64))
            .prop_map(|(pointer, allocation, zeroing, size)| Op::Allocate { pointer, allocation, zeroing, size }),
        (0..4usize, 0..4usize).prop_map(|(pointer, original)| Op::Alias { pointer, original }),
        (0..4usize).prop_map(|pointer| Op::Release { pointer }),
    ]
}

fn types(ctx: &EncoderContext) -> Vec<CanonicalType> {
    vec![
        CanonicalType::int(),
        CanonicalType::char(),
        CanonicalType::int().array_of(Some(2)),
        canonical(ctx, &pair()),
        CanonicalType::int().pointer_to(),
    ]
}

fn apply(builder: &mut PointerTargetSetBuilder<'_>, types: &[CanonicalType], op: &Op) {
    let pointer = |i: usize| format!("main::p{}", i);
    match op {
        Op::AddBase { base, ty } => {
            builder.add_base(&format!("main::b{}", base), &types[*ty]);
        }
        Op::AddField { field } => {
            builder.add_field(&types[3], ["a", "b"][*field]);
        }
        Op::Allocate { pointer: p, allocation, zeroing, size } => {
            if !builder.is_deferred_allocation_pointer(&pointer(*p)) {
                builder.add_deferred_allocation(&pointer(*p), *zeroing, *size, &format!("__alloc_{}", allocation));
            }
        }
        Op::Alias { pointer: p, original } => {
            let (p, original) = (pointer(*p), pointer(*original));
            if p != original
                && builder.is_deferred_allocation_pointer(&original)
                && !builder.is_deferred_allocation_pointer(&p)
            {
                builder.add_deferred_allocation_pointer(&p, &original).unwrap();
            }
        }
        Op::Release { pointer: p } => {
            if builder.is_deferred_allocation_pointer(&pointer(*p)) {
                builder.remove_deferred_allocation_pointer(&pointer(*p)).unwrap();
            }
        }
    }
}

fn build(ctx: &EncoderContext, start: &PointerTargetSet, ops: &[Op]) -> PointerTargetSet {
    let types = types(ctx);
    let mut builder = start.builder(ctx);
    for op in ops {
        apply(&mut builder, &types, op);
    }
    builder.build()
}

fn real_bases(pts: &PointerTargetSet) -> BTreeMap<String, CanonicalType> {
    pts.bases()
        .iter()
        .filter(|(name, _)| !name.starts_with(FAKE_ALLOCATION_PREFIX))
        .map(|(name, ty)| (name.clone(), ty.clone()))
        .collect()
}

fn pool_sets(pts: &PointerTargetSet) -> BTreeMap<String, (BTreeSet<String>, BTreeSet<String>, bool, Option<u64>)> {
    pts.deferred_allocations()
        .iter()
        .map(|(pointer, pool)| {
            (
                pointer.clone(),
                (
                    pool.pointer_variables().iter().cloned().collect(),
                    pool.base_variables().iter().cloned().collect(),
                    pool.is_zeroing(),
                    pool.size(),
                ),
            )
        })
        .collect()
}

fn branches() -> impl Strategy<Value = (Vec<Op>, Vec<Op>, Vec<Op>)> {
    (
        prop::collection::vec(op(), 0..6),
        prop::collection::vec(op(), 0..10),
        prop::collection::vec(op(), 0..10),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_merge_is_commutative((prefix, left, right) in branches()) {
        let ctx = EncoderContext::with_defaults();
        let start = build(&ctx, &PointerTargetSet::empty(), &prefix);
        let a = build(&ctx, &start, &left);
        let b = build(&ctx, &start, &right);

        let engine = MergeEngine::new(&ctx);
        let ab = engine.merge(&a, &b).snapshot;
        let ba = engine.merge(&b, &a).snapshot;

        prop_assert_eq!(real_bases(&ab), real_bases(&ba));
        prop_assert_eq!(ab.fields(), ba.fields());
        prop_assert_eq!(ab.targets(), ba.targets());
        prop_assert_eq!(pool_sets(&ab), pool_sets(&ba));
    }

    #[test]
    fn prop_merge_keeps_every_base_and_field((prefix, left, right) in branches()) {
        let ctx = EncoderContext::with_defaults();
        let start = build(&ctx, &PointerTargetSet::empty(), &prefix);
        let a = build(&ctx, &start, &left);
        let b = build(&ctx, &start, &right);
        let merged = MergeEngine::new(&ctx).merge(&a, &b).snapshot;

        for name in a.bases().keys().chain(b.bases().keys()) {
            prop_assert!(merged.bases().contains_key(name), "base {} lost", name);
        }
        for field in a.fields().iter().chain(b.fields().iter()) {
            prop_assert!(merged.fields().contains(field));
        }
        for pointer in a.deferred_allocations().keys().chain(b.deferred_allocations().keys()) {
            prop_assert!(merged.is_deferred_allocation_pointer(pointer));
        }
    }

    #[test]
    fn prop_merge_with_itself_is_shared((prefix, ops) in (prop::collection::vec(op(), 0..6), prop::collection::vec(op(), 0..10))) {
        let ctx = EncoderContext::with_defaults();
        let start = build(&ctx, &PointerTargetSet::empty(), &prefix);
        let a = build(&ctx, &start, &ops);
        let result = MergeEngine::new(&ctx).merge(&a, &a.clone());
        prop_assert!(result.snapshot.ptr_eq(&a));
        prop_assert!(result.formula.is_true());
    }

    #[test]
    fn prop_merged_pools_alias_consistently((prefix, left, right) in branches()) {
        let ctx = EncoderContext::with_defaults();
        let start = build(&ctx, &PointerTargetSet::empty(), &prefix);
        let a = build(&ctx, &start, &left);
        let b = build(&ctx, &start, &right);
        let merged = MergeEngine::new(&ctx).merge(&a, &b).snapshot;

        for (pointer, pool) in merged.deferred_allocations().iter() {
            prop_assert!(pool.pointer_variables().contains(pointer));
            for alias in pool.pointer_variables().iter() {
                prop_assert_eq!(merged.deferred_allocation(alias), Some(pool));
            }
        }
    }
}
