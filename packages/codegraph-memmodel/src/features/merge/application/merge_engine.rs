//! Join of two pointer-target-set snapshots
//!
//! ```text
//! bases        union; one name with two types gets a synthetic union type
//! fields       union, plus the members of every synthetic union
//! targets      union per cell type, structurally deduplicated, completed
//!              for bases that only one side knew
//! pools        merged per pointer until no two pools share a pointer
//! last base    kept when both sides agree, else a fresh fake base is
//!              ordered after both
//! ```

use crate::context::EncoderContext;
use crate::features::formula::Formula;
use crate::features::merge::infrastructure::{merge_maps, merge_sets, merge_vectors, split_merge};
use crate::features::pointer_target_set::{
    is_fake_base_type, CompositeField, DeferredAllocationPool, PointerTargetSet,
};
use crate::shared::models::{CType, CanonicalType, Member};
use im::OrdMap;
use std::sync::Arc;
use tracing::debug;

/// Tag prefix of synthetic union types
pub const UNITED_BASE_PREFIX: &str = "__base_union_of_";
/// Member name prefix of synthetic union types
pub const UNITED_FIELD_PREFIX: &str = "__united_field";
/// Name prefix of fake bases separating the two branches' allocations
pub const FAKE_ALLOCATION_PREFIX: &str = "__fake_alloc_";

#[derive(Debug, Clone)]
pub struct MergeResult {
    pub snapshot: PointerTargetSet,
    /// Address ordering obligations created by the merge
    pub formula: Formula,
    /// Bases only the first snapshot had, with their types there
    pub only_in_a: OrdMap<String, CanonicalType>,
    /// Bases only the second snapshot had, with their types there
    pub only_in_b: OrdMap<String, CanonicalType>,
}

pub struct MergeEngine<'a> {
    ctx: &'a EncoderContext,
}

impl<'a> MergeEngine<'a> {
    pub fn new(ctx: &'a EncoderContext) -> Self {
        Self { ctx }
    }

    pub fn merge(&self, a: &PointerTargetSet, b: &PointerTargetSet) -> MergeResult {
        let mut united: Vec<(String, CanonicalType)> = Vec::new();
        let bases = split_merge(&a.bases, &b.bases, |name, left, right| {
            let ty = self.unite(left, right);
            united.push((name.clone(), ty.clone()));
            ty
        });

        let mut fields = merge_sets(&a.fields, &b.fields);
        for (base, ty) in &united {
            if let Some(layout) = self.ctx.layout().composite(ty) {
                debug!(base = %base, ty = %ty, members = layout.members.len(), "united base types");
                for member in &layout.members {
                    fields.insert(CompositeField::of(ty, member.name.as_str()));
                }
            }
        }

        let targets = merge_maps(&a.targets, &b.targets, |_, left, right| merge_vectors(left, right));
        let deferred_allocations = merge_pools(&a.deferred_allocations, &b.deferred_allocations);

        let mut merged_bases = bases.merged;
        let (last_base, formula) = if a.last_base == b.last_base {
            (a.last_base.clone(), Formula::tt())
        } else {
            let fake = format!("{}{}", FAKE_ALLOCATION_PREFIX, self.ctx.next_allocation_id());
            let formula = Formula::and2(
                a.next_base_address_inequality(self.ctx, &fake, a.last_base()),
                b.next_base_address_inequality(self.ctx, &fake, b.last_base()),
            );
            debug!(
                fake = %fake,
                a = ?a.last_base(),
                b = ?b.last_base(),
                "reconciled diverging last bases"
            );
            merged_bases.insert(fake.clone(), CanonicalType::fake_base(0));
            (Some(fake), formula)
        };

        let snapshot = PointerTargetSet {
            bases: merged_bases,
            last_base,
            fields,
            deferred_allocations,
            targets,
        };

        // bases seen on one side only may lack targets for fields the other
        // side tracked; united bases lack the targets of the union members
        let mut builder = snapshot.builder(self.ctx);
        let mut incomplete: Vec<(String, CanonicalType)> = bases
            .only_in_first
            .iter()
            .chain(bases.only_in_second.iter())
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .chain(united)
            .collect();
        // name order, whichever side came first
        incomplete.sort();
        for (name, ty) in incomplete {
            if !is_fake_base_type(&ty) {
                builder.add_targets(&name, &ty);
            }
        }

        MergeResult {
            snapshot: builder.build(),
            formula,
            only_in_a: bases.only_in_first,
            only_in_b: bases.only_in_second,
        }
    }

    /// Type for a base that has different types on the two sides
    ///
    /// A reserved slot gives way to a revealed type. Otherwise the result is
    /// a union over both types, flattened through earlier synthetic unions,
    /// with its members ordered by type key so the result does not depend
    /// on which side came first.
    fn unite(&self, left: &CanonicalType, right: &CanonicalType) -> CanonicalType {
        match (is_fake_base_type(left), is_fake_base_type(right)) {
            (true, true) => {
                return if self.ctx.size_of(left) >= self.ctx.size_of(right) {
                    left.clone()
                } else {
                    right.clone()
                }
            }
            (true, false) => return right.clone(),
            (false, true) => return left.clone(),
            (false, false) => {}
        }

        let mut members: Vec<CanonicalType> = Vec::new();
        for ty in [left, right] {
            for member in self.united_members(ty) {
                if !members.contains(&member) {
                    members.push(member);
                }
            }
        }
        members.sort();

        let tag = members
            .iter()
            .map(|ty| ty.key().replace(' ', "_"))
            .collect::<Vec<_>>()
            .join("_and_");
        let union = CType::union_type(
            format!("{}{}", UNITED_BASE_PREFIX, tag),
            members
                .iter()
                .enumerate()
                .map(|(i, ty)| Member::new(format!("{}{}", UNITED_FIELD_PREFIX, i), ty.ty().clone()))
                .collect(),
        );
        self.ctx.layout().register(&union);
        CanonicalType::of(&union)
    }

    /// Members of a synthetic union, or the type itself
    fn united_members(&self, ty: &CanonicalType) -> Vec<CanonicalType> {
        match self.ctx.layout().composite(ty) {
            Some(layout) if layout.is_union() && is_united(&layout.name) => {
                layout.members.iter().map(|m| m.ty.clone()).collect()
            }
            _ => vec![ty.clone()],
        }
    }
}

fn is_united(name: &str) -> bool {
    name.starts_with(UNITED_BASE_PREFIX)
}

/// Per-pointer union of deferred pools, closed under shared pointers
fn merge_pools(
    a: &OrdMap<String, Arc<DeferredAllocationPool>>,
    b: &OrdMap<String, Arc<DeferredAllocationPool>>,
) -> OrdMap<String, Arc<DeferredAllocationPool>> {
    if a.ptr_eq(b) {
        return a.clone();
    }
    let mut result = a.clone();
    for (pointer, pool) in b.iter() {
        let mut merged = match result.get(pointer) {
            None => {
                result.insert(pointer.clone(), Arc::clone(pool));
                continue;
            }
            Some(existing) if **existing == **pool => continue,
            Some(existing) => existing.merge_with(pool),
        };
        // pools reached through any pointer of the merged pool join it too
        loop {
            let mut grown = merged.clone();
            for alias in merged.pointer_variables().iter() {
                if let Some(other) = result.get(alias) {
                    if **other != grown {
                        grown = grown.merge_with(other);
                    }
                }
            }
            if grown == merged {
                break;
            }
            merged = grown;
        }
        let merged = Arc::new(merged);
        for alias in merged.pointer_variables().iter() {
            result.insert(alias.clone(), Arc::clone(&merged));
        }
    }
    result
}
