//! Mutable view over a pointer-target-set snapshot
//!
//! Obtained from [`PointerTargetSet::builder`]; every mutation operates on
//! the builder's own persistent copies, the source snapshot never changes.

use crate::context::EncoderContext;
use crate::errors::{EncodingError, Result};
use crate::features::formula::Formula;
use crate::features::pointer_target::PointerTarget;
use crate::features::pointer_target_set::domain::{
    is_fake_base_type, CompositeField, DeferredAllocationPool, PointerTargetSet,
};
use crate::features::type_layout::{CompositeLayout, Leaf, MemberLayout};
use crate::shared::models::CanonicalType;
use im::{OrdSet, Vector};
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

pub struct PointerTargetSetBuilder<'a> {
    ctx: &'a EncoderContext,
    state: PointerTargetSet,
}

impl Deref for PointerTargetSetBuilder<'_> {
    type Target = PointerTargetSet;

    fn deref(&self) -> &PointerTargetSet {
        &self.state
    }
}

fn tracked_by(fields: &OrdSet<CompositeField>) -> impl Fn(&CompositeLayout, &MemberLayout) -> bool + '_ {
    move |layout: &CompositeLayout, member: &MemberLayout| {
        fields.contains(&CompositeField::of(&layout.ty, member.name.as_str()))
    }
}

impl<'a> PointerTargetSetBuilder<'a> {
    pub fn new(ctx: &'a EncoderContext, snapshot: &PointerTargetSet) -> Self {
        Self {
            ctx,
            state: snapshot.clone(),
        }
    }

    #[inline]
    pub fn context(&self) -> &'a EncoderContext {
        self.ctx
    }

    /// Reserve an address slot of `size` bytes for a base whose type is not
    /// known yet, returning the ordering constraint for the slot
    pub fn prepare_base(&mut self, name: &str, size: u64) -> Formula {
        if self.state.is_prepared_base(name) {
            return Formula::tt();
        }
        let inequality =
            self.state
                .next_base_address_inequality(self.ctx, name, self.state.last_base.as_deref());
        debug!(base = name, size, "prepared base");
        self.state
            .bases
            .insert(name.to_string(), CanonicalType::fake_base(size));
        self.state.last_base = Some(name.to_string());
        inequality
    }

    /// Register a new base of type `ty`
    ///
    /// Returns whether any target was generated, and the address ordering
    /// constraint for the new base. A base that is already real is left
    /// unchanged; a prepared one is given its type in place.
    pub fn add_base(&mut self, name: &str, ty: &CanonicalType) -> (bool, Formula) {
        if self.state.is_actual_base(name) {
            return (false, Formula::tt());
        }
        if self.state.is_prepared_base(name) {
            return (self.share_base(name, ty), Formula::tt());
        }

        let inequality =
            self.state
                .next_base_address_inequality(self.ctx, name, self.state.last_base.as_deref());
        self.state.bases.insert(name.to_string(), ty.clone());
        self.state.last_base = Some(name.to_string());
        let essential = self.add_targets(name, ty);
        debug!(base = name, ty = %ty, essential, "added base");
        (essential, inequality)
    }

    /// Give a real type to an already prepared base, keeping its address slot
    pub fn share_base(&mut self, name: &str, ty: &CanonicalType) -> bool {
        if self.state.is_base(name, ty) {
            return false;
        }
        debug!(base = name, ty = %ty, "shared base");
        self.state.bases.insert(name.to_string(), ty.clone());
        self.add_targets(name, ty)
    }

    /// Generate the targets of `base` under the current tracked fields
    pub(crate) fn add_targets(&mut self, base: &str, ty: &CanonicalType) -> bool {
        let mut leaves = Vec::new();
        {
            let include = tracked_by(&self.state.fields);
            self.ctx
                .layout()
                .walk_leaves(ty, None, 0, 0, &include, &mut |leaf: Leaf| leaves.push(leaf));
        }
        let mut added = false;
        for leaf in leaves {
            added |= self.push_target(base, leaf);
        }
        added
    }

    fn push_target(&mut self, base: &str, leaf: Leaf) -> bool {
        let target = PointerTarget::new(
            base,
            leaf.container,
            leaf.proper_offset,
            leaf.container_offset,
        );
        match self.state.targets.get_mut(&leaf.ty) {
            Some(targets) if targets.contains(&target) => false,
            Some(targets) => {
                targets.push_back(target);
                true
            }
            None => {
                self.state.targets.insert(leaf.ty, Vector::unit(target));
                true
            }
        }
    }

    /// Start tracking `composite.field`, generating its targets in every
    /// existing base that contains the composite
    ///
    /// Returns whether any target was generated. Tracking an already tracked
    /// field generates nothing.
    pub fn add_field(&mut self, composite: &CanonicalType, field: &str) -> bool {
        let key = CompositeField::of(composite, field);
        if self.state.fields.contains(&key) {
            return false;
        }
        let layout = self.ctx.layout();
        let Some(member) = layout
            .composite(composite)
            .and_then(|c| c.member(field).cloned())
        else {
            return false;
        };

        let positions: Vec<(String, u64)> = {
            let include = tracked_by(&self.state.fields);
            self.state
                .bases
                .iter()
                .flat_map(|(name, base_ty)| {
                    layout
                        .occurrences(base_ty, composite, &include)
                        .into_iter()
                        .map(move |pos| (name.clone(), pos))
                })
                .collect()
        };

        self.state.fields.insert(key);
        let mut generated: Vec<(String, Leaf)> = Vec::new();
        {
            let include = tracked_by(&self.state.fields);
            for (base, position) in &positions {
                layout.walk_leaves(
                    &member.ty,
                    Some(composite),
                    member.offset,
                    *position,
                    &include,
                    &mut |leaf: Leaf| generated.push((base.clone(), leaf)),
                );
            }
        }
        let mut added = false;
        for (base, leaf) in generated {
            added |= self.push_target(&base, leaf);
        }
        debug!(composite = %composite, field, added, "tracked field");
        added
    }

    /// Stop tracking a field without touching the targets generated for it
    ///
    /// Only meant to roll back a speculative [`Self::add_field`] that
    /// generated nothing.
    pub fn shallow_remove_field(&mut self, composite: &CanonicalType, field: &str) {
        self.state.fields.remove(&CompositeField::of(composite, field));
    }

    /// Record a fresh untyped allocation held in `pointer`
    pub fn add_deferred_allocation(
        &mut self,
        pointer: &str,
        is_zeroing: bool,
        size: Option<u64>,
        base_variable: &str,
    ) {
        debug!(pointer, base = base_variable, ?size, is_zeroing, "deferred allocation");
        let pool = DeferredAllocationPool::new(pointer, is_zeroing, size, base_variable);
        self.state
            .deferred_allocations
            .insert(pointer.to_string(), Arc::new(pool));
    }

    /// Record an allocation not yet held by any variable, keyed by its base
    pub fn add_temporary_deferred_allocation(
        &mut self,
        is_zeroing: bool,
        size: Option<u64>,
        base_variable: &str,
    ) {
        self.add_deferred_allocation(base_variable, is_zeroing, size, base_variable);
    }

    fn install_pool(&mut self, pool: DeferredAllocationPool) {
        let pool = Arc::new(pool);
        for pointer in pool.pointer_variables().iter() {
            self.state
                .deferred_allocations
                .insert(pointer.clone(), Arc::clone(&pool));
        }
    }

    fn pool_of(&self, pointer: &str) -> Result<Arc<DeferredAllocationPool>> {
        self.state
            .deferred_allocations
            .get(pointer)
            .cloned()
            .ok_or_else(|| EncodingError::unknown_deferred_allocation(pointer))
    }

    /// Make `new_pointer` an alias of the pool held by `original`
    pub fn add_deferred_allocation_pointer(&mut self, new_pointer: &str, original: &str) -> Result<()> {
        let pool = self.pool_of(original)?;
        self.install_pool(pool.with_pointer(new_pointer));
        Ok(())
    }

    /// Drop one alias; returns true when it was the pool's last one
    pub fn remove_deferred_allocation_pointer(&mut self, old_pointer: &str) -> Result<bool> {
        let pool = self.pool_of(old_pointer)?;
        self.state.deferred_allocations.remove(old_pointer);
        let remaining = pool.without_pointer(old_pointer);
        if remaining.pointer_variables().is_empty() {
            return Ok(true);
        }
        self.install_pool(remaining);
        Ok(false)
    }

    /// Remove the whole pool reachable from `pointer`, with all its aliases
    pub fn remove_deferred_allocation(&mut self, pointer: &str) -> Result<DeferredAllocationPool> {
        let pool = self.pool_of(pointer)?;
        for alias in pool.pointer_variables().iter() {
            self.state.deferred_allocations.remove(alias.as_str());
        }
        Ok(DeferredAllocationPool::clone(&pool))
    }

    pub fn build(self) -> PointerTargetSet {
        self.state
    }
}

impl PointerTargetSetBuilder<'_> {
    /// Whether `name` was prepared but not revealed yet
    pub fn is_pending_base(&self, name: &str) -> bool {
        self.state.bases.get(name).is_some_and(is_fake_base_type)
    }
}
