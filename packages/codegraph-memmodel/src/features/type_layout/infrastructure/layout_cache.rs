//! Size / offset computation with a shared composite cache
//!
//! Composite layouts are cached in a `DashMap` keyed by canonical type. A miss
//! computes the layout without holding any shard lock and inserts the result;
//! two workers racing on the same key compute identical values, so the
//! second insert is harmless.

use crate::features::type_layout::domain::{
    CompositeLayout, Leaf, MachineModel, MemberLayout, TypeShape,
};
use crate::shared::models::{CType, CanonicalType, CompositeKind, CompositeType};
use dashmap::DashMap;
use std::sync::Arc;

#[inline]
fn round_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        value
    } else {
        value.div_ceil(align) * align
    }
}

#[derive(Debug)]
pub struct TypeLayout {
    model: MachineModel,
    max_array_length: u64,
    composites: DashMap<CanonicalType, Arc<CompositeLayout>>,
    /// Complete definitions by key, used to resolve forward references
    definitions: DashMap<String, Arc<CompositeType>>,
}

impl TypeLayout {
    pub fn new(model: MachineModel, max_array_length: u64) -> Self {
        Self {
            model,
            max_array_length,
            composites: DashMap::new(),
            definitions: DashMap::new(),
        }
    }

    #[inline]
    pub fn model(&self) -> &MachineModel {
        &self.model
    }

    #[inline]
    pub fn max_array_length(&self) -> u64 {
        self.max_array_length
    }

    #[inline]
    pub fn pointer_bits(&self) -> u32 {
        self.model.pointer_bits()
    }

    pub fn cached_layouts(&self) -> usize {
        self.composites.len()
    }

    /// Record every complete composite definition reachable from `ty`
    pub fn register(&self, ty: &CType) {
        match ty {
            CType::Composite(def) => {
                if self.definitions.contains_key(&def.key()) {
                    return;
                }
                self.definitions.insert(def.key(), def.clone());
                for member in &def.members {
                    self.register(&member.ty);
                }
            }
            CType::Elaborated {
                resolved: Some(def),
                ..
            } => self.register(&CType::Composite(def.clone())),
            CType::Pointer(inner)
            | CType::Array { element: inner, .. }
            | CType::Typedef { target: inner, .. }
            | CType::Qualified { inner, .. } => self.register(inner),
            CType::Function {
                return_type,
                params,
                ..
            } => {
                self.register(return_type);
                for param in params {
                    self.register(param);
                }
            }
            CType::Simple { .. } | CType::Elaborated { .. } | CType::Enum { .. } => {}
        }
    }

    /// Replace a forward reference by its registered definition
    pub fn resolve(&self, ty: &CanonicalType) -> CanonicalType {
        if let CType::Elaborated { .. } = ty.ty() {
            if let Some(def) = self.definitions.get(ty.key()) {
                return CanonicalType::of(&CType::Composite(def.value().clone()));
            }
        }
        ty.clone()
    }

    pub fn shape(&self, ty: &CanonicalType) -> TypeShape {
        match ty.ty() {
            CType::Array { element, length } => TypeShape::Array {
                element: CanonicalType::of(element),
                length: length.unwrap_or(self.max_array_length),
            },
            CType::Composite(_) | CType::Elaborated { .. } => match self.composite(ty) {
                Some(layout) => TypeShape::Composite(layout),
                None => TypeShape::Scalar,
            },
            CType::Function { .. } => TypeShape::Function,
            _ => TypeShape::Scalar,
        }
    }

    /// Layout of a struct or union; `None` for incomplete and non-composite types
    pub fn composite(&self, ty: &CanonicalType) -> Option<Arc<CompositeLayout>> {
        let ty = self.resolve(ty);
        let def = match ty.ty() {
            CType::Composite(def) => def.clone(),
            _ => return None,
        };
        if let Some(cached) = self.composites.get(&ty) {
            return Some(cached.value().clone());
        }
        self.register(ty.ty());
        let layout = Arc::new(self.compute_composite(&ty, &def));
        self.composites.insert(ty, layout.clone());
        Some(layout)
    }

    fn compute_composite(&self, ty: &CanonicalType, def: &CompositeType) -> CompositeLayout {
        let mut members = Vec::with_capacity(def.members.len());
        let mut offset = 0;
        let mut largest = 0;
        let mut align = 1;
        for member in &def.members {
            let member_ty = self.resolve(&CanonicalType::of(&member.ty));
            let member_size = self.size_of(&member_ty);
            let member_align = self.align_of(&member_ty);
            align = align.max(member_align);
            let member_offset = match def.kind {
                CompositeKind::Struct => {
                    let at = round_up(offset, member_align);
                    offset = at + member_size;
                    at
                }
                CompositeKind::Union => {
                    largest = largest.max(member_size);
                    0
                }
            };
            members.push(MemberLayout {
                name: member.name.clone(),
                ty: member_ty,
                offset: member_offset,
            });
        }
        let raw = match def.kind {
            CompositeKind::Struct => offset,
            CompositeKind::Union => largest,
        };
        CompositeLayout {
            ty: ty.clone(),
            kind: def.kind,
            name: def.name.clone(),
            size: round_up(raw, align),
            align,
            members,
        }
    }

    /// Size in bytes; arrays of unknown length count the default length
    pub fn size_of(&self, ty: &CanonicalType) -> u64 {
        match ty.ty() {
            CType::Simple { basic, .. } => self.model.size_of_basic(*basic),
            CType::Pointer(_) => self.model.sizeof_pointer,
            CType::Array { element, length } => {
                length.unwrap_or(self.max_array_length) * self.size_of(&CanonicalType::of(element))
            }
            CType::Composite(_) | CType::Elaborated { .. } => {
                self.composite(ty).map_or(0, |layout| layout.size)
            }
            CType::Function { .. } => 1,
            CType::Typedef { .. } | CType::Enum { .. } | CType::Qualified { .. } => {
                self.size_of(&CanonicalType::of(ty.ty()))
            }
        }
    }

    pub fn align_of(&self, ty: &CanonicalType) -> u64 {
        match ty.ty() {
            CType::Simple { basic, .. } => self.model.align_of_basic(*basic),
            CType::Pointer(_) => self.model.sizeof_pointer,
            CType::Array { element, .. } => self.align_of(&CanonicalType::of(element)),
            CType::Composite(_) | CType::Elaborated { .. } => {
                self.composite(ty).map_or(1, |layout| layout.align)
            }
            _ => 1,
        }
    }

    /// Width of the bit-vector representing a value of this type
    pub fn bit_width(&self, ty: &CanonicalType) -> u32 {
        match ty.ty() {
            CType::Pointer(_) | CType::Function { .. } | CType::Array { .. } => self.pointer_bits(),
            _ => (self.size_of(ty).max(1) * 8) as u32,
        }
    }

    pub fn offset_of(&self, ty: &CanonicalType, member: &str) -> Option<u64> {
        self.composite(ty)?.member(member).map(|m| m.offset)
    }

    pub fn member_type(&self, ty: &CanonicalType, member: &str) -> Option<CanonicalType> {
        self.composite(ty)?.member(member).map(|m| m.ty.clone())
    }

    /// Members of a composite with their offsets; empty for other types
    pub fn members(&self, ty: &CanonicalType) -> Vec<MemberLayout> {
        self.composite(ty)
            .map(|layout| layout.members.clone())
            .unwrap_or_default()
    }

    /// Declared length of an array, or the configured default when unknown
    pub fn array_length(&self, ty: &CanonicalType) -> Option<u64> {
        match ty.ty() {
            CType::Array { length, .. } => Some(length.unwrap_or(self.max_array_length)),
            _ => None,
        }
    }

    /// `(index, byte offset)` of every unrolled element of an array
    pub fn elements(&self, ty: &CanonicalType) -> Vec<(u64, u64)> {
        let Some((element, _)) = ty.array_element() else {
            return Vec::new();
        };
        let stride = self.size_of(&element);
        let length = self.array_length(ty).map_or(0, |n| self.unrolled_length(n));
        (0..length).map(|i| (i, i * stride)).collect()
    }

    /// Number of elements unrolled when generating targets for an array
    #[inline]
    pub fn unrolled_length(&self, length: u64) -> u64 {
        length.min(self.max_array_length)
    }

    /// Walk the scalar sub-objects of `ty`, descending only into members
    /// accepted by `include`. Arrays are unrolled up to the configured bound.
    pub fn walk_leaves<F, V>(
        &self,
        ty: &CanonicalType,
        container: Option<&CanonicalType>,
        proper_offset: u64,
        container_offset: u64,
        include: &F,
        visit: &mut V,
    ) where
        F: Fn(&CompositeLayout, &MemberLayout) -> bool,
        V: FnMut(Leaf),
    {
        match self.shape(ty) {
            TypeShape::Array { element, length } => {
                let element_size = self.size_of(&element);
                for i in 0..self.unrolled_length(length) {
                    self.walk_leaves(
                        &element,
                        Some(ty),
                        i * element_size,
                        container_offset + proper_offset,
                        include,
                        visit,
                    );
                }
            }
            TypeShape::Composite(layout) => {
                for member in layout.members.iter().filter(|m| include(&layout, m)) {
                    self.walk_leaves(
                        &member.ty,
                        Some(ty),
                        member.offset,
                        container_offset + proper_offset,
                        include,
                        visit,
                    );
                }
            }
            TypeShape::Scalar | TypeShape::Function => visit(Leaf {
                ty: self.resolve(ty),
                container: container.cloned(),
                proper_offset,
                container_offset,
            }),
        }
    }

    /// Offsets from the start of `ty` at which an object of type `target`
    /// occurs, descending through arrays and accepted members only
    pub fn occurrences<F>(&self, ty: &CanonicalType, target: &CanonicalType, include: &F) -> Vec<u64>
    where
        F: Fn(&CompositeLayout, &MemberLayout) -> bool,
    {
        let mut found = Vec::new();
        self.collect_occurrences(ty, target, 0, include, &mut found);
        found
    }

    fn collect_occurrences<F>(
        &self,
        ty: &CanonicalType,
        target: &CanonicalType,
        offset: u64,
        include: &F,
        found: &mut Vec<u64>,
    ) where
        F: Fn(&CompositeLayout, &MemberLayout) -> bool,
    {
        if ty == target {
            found.push(offset);
        }
        match self.shape(ty) {
            TypeShape::Array { element, length } => {
                let element_size = self.size_of(&element);
                for i in 0..self.unrolled_length(length) {
                    self.collect_occurrences(&element, target, offset + i * element_size, include, found);
                }
            }
            TypeShape::Composite(layout) => {
                for member in layout.members.iter().filter(|m| include(&layout, m)) {
                    self.collect_occurrences(&member.ty, target, offset + member.offset, include, found);
                }
            }
            TypeShape::Scalar | TypeShape::Function => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BasicType, Member};

    fn layout64() -> TypeLayout {
        TypeLayout::new(MachineModel::linux64(), 16)
    }

    fn mixed() -> CanonicalType {
        CanonicalType::of(&CType::struct_type(
            "mixed",
            vec![
                Member::new("c", CType::char()),
                Member::new("i", CType::int()),
                Member::new("p", CType::pointer_to(CType::void())),
                Member::new("s", CType::simple(BasicType::Short)),
            ],
        ))
    }

    #[test]
    fn test_members_and_elements() {
        let layout = layout64();
        let offsets: Vec<(String, u64)> = layout
            .members(&mixed())
            .into_iter()
            .map(|m| (m.name, m.offset))
            .collect();
        assert_eq!(offsets.len(), 4);
        assert_eq!(offsets[2], ("p".to_string(), 8));
        assert!(layout.members(&CanonicalType::int()).is_empty());

        let ints = CanonicalType::int().array_of(Some(3));
        assert_eq!(layout.array_length(&ints), Some(3));
        assert_eq!(layout.elements(&ints), vec![(0, 0), (1, 4), (2, 8)]);
        let open = CanonicalType::char().array_of(None);
        assert_eq!(layout.array_length(&open), Some(16));
        assert_eq!(layout.elements(&open).len(), 16);
        assert_eq!(layout.array_length(&CanonicalType::int()), None);
    }

    #[test]
    fn test_struct_padding() {
        let layout = layout64();
        let ty = mixed();
        assert_eq!(layout.offset_of(&ty, "c"), Some(0));
        assert_eq!(layout.offset_of(&ty, "i"), Some(4));
        assert_eq!(layout.offset_of(&ty, "p"), Some(8));
        assert_eq!(layout.offset_of(&ty, "s"), Some(16));
        assert_eq!(layout.size_of(&ty), 24);
        assert_eq!(layout.align_of(&ty), 8);
    }

    #[test]
    fn test_struct_padding_linux32() {
        let layout = TypeLayout::new(MachineModel::linux32(), 16);
        let ty = mixed();
        assert_eq!(layout.offset_of(&ty, "s"), Some(12));
        assert_eq!(layout.size_of(&ty), 16);
    }

    #[test]
    fn test_union_members_share_offset() {
        let layout = layout64();
        let ty = CanonicalType::of(&CType::union_type(
            "u",
            vec![
                Member::new("c", CType::char()),
                Member::new("l", CType::long()),
            ],
        ));
        assert_eq!(layout.offset_of(&ty, "c"), Some(0));
        assert_eq!(layout.offset_of(&ty, "l"), Some(0));
        assert_eq!(layout.size_of(&ty), 8);
    }

    #[test]
    fn test_arrays_and_scalars() {
        let layout = layout64();
        assert_eq!(layout.size_of(&CanonicalType::int().array_of(Some(3))), 12);
        assert_eq!(layout.size_of(&CanonicalType::int().array_of(None)), 64);
        assert_eq!(layout.size_of(&CanonicalType::void()), 1);
        assert_eq!(layout.size_of(&CanonicalType::fake_base(4)), 4);
        assert_eq!(layout.bit_width(&CanonicalType::int()), 32);
        assert_eq!(layout.bit_width(&CanonicalType::char().pointer_to()), 64);
    }

    #[test]
    fn test_cache_is_reused() {
        let layout = layout64();
        let ty = mixed();
        let first = layout.composite(&ty).unwrap();
        let second = layout.composite(&ty).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(layout.cached_layouts(), 1);
    }

    #[test]
    fn test_forward_reference_resolved_after_registration() {
        let layout = layout64();
        let node = CType::struct_type(
            "node",
            vec![
                Member::new("val", CType::int()),
                Member::new("next", CType::pointer_to(CType::elaborated_struct("node"))),
            ],
        );
        let forward = CanonicalType::of(&CType::elaborated_struct("node"));
        assert!(layout.composite(&forward).is_none());

        layout.register(&node);
        assert_eq!(layout.size_of(&forward), 16);
        assert_eq!(layout.offset_of(&forward, "next"), Some(8));
    }

    #[test]
    fn test_walk_leaves_respects_filter_and_bound() {
        let layout = TypeLayout::new(MachineModel::linux64(), 2);
        let arr = CanonicalType::of(&CType::array_of(mixed().ty().clone(), Some(5)));
        let mut leaves = Vec::new();
        layout.walk_leaves(
            &arr,
            None,
            0,
            0,
            &|_: &CompositeLayout, m: &MemberLayout| m.name == "i",
            &mut |leaf: Leaf| leaves.push(leaf),
        );
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].container_offset, 24);
        assert_eq!(leaves[1].proper_offset, 4);
        assert_eq!(leaves[1].container, Some(mixed()));
    }

    #[test]
    fn test_occurrences() {
        let layout = layout64();
        let arr = CanonicalType::of(&CType::array_of(mixed().ty().clone(), Some(3)));
        let found = layout.occurrences(&arr, &mixed(), &|_: &CompositeLayout, _: &MemberLayout| true);
        assert_eq!(found, vec![0, 24, 48]);
    }
}
