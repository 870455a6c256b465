//! Static classification of written lvalues
//!
//! Follows the lvalue down to a named base as far as offsets stay
//! compile-time constants:
//! - `x`, `s.f`, `a[2]`, `s.a[1].g` on a base give exact patterns
//! - `a[i]` keeps the base but loses the offset (semiexact)
//! - anything reached through a pointer is inexact, narrowed by the
//!   container type and member offset where known

use super::edge_state::EdgeState;
use crate::features::pointer_target::PointerTargetPattern;
use crate::shared::models::{CExpression, CanonicalType, ExprKind};

impl<'a> EdgeState<'a> {
    pub(crate) fn pattern_for(&self, e: &CExpression) -> PointerTargetPattern {
        let ctx = self.ctx;
        let layout = ctx.layout();
        match &e.kind {
            ExprKind::Id(name) if self.pts.is_actual_base(name) => {
                PointerTargetPattern::exact(name.as_str(), None, 0, 0)
            }
            ExprKind::Field {
                owner,
                field,
                arrow: false,
            } => {
                let parent = self.pattern_for(owner);
                let owner_ty = self.canonical(&owner.ty);
                let offset = layout.offset_of(&owner_ty, field);
                Self::nested(&parent, owner_ty, offset)
            }
            ExprKind::Field {
                owner,
                field,
                arrow: true,
            } => {
                let mut pattern = PointerTargetPattern::any();
                if let Some(owner_ty) = self.canonical(&owner.ty).pointee() {
                    let owner_ty = layout.resolve(&owner_ty);
                    pattern.set_proper_offset(layout.offset_of(&owner_ty, field));
                    pattern.set_container_type(Some(owner_ty));
                }
                pattern
            }
            ExprKind::Subscript { array, index } => {
                let array_ty = self.canonical(&array.ty);
                match array_ty.array_element() {
                    Some((element, _)) => {
                        let parent = self.pattern_for(array);
                        let element_size = layout.size_of(&layout.resolve(&element));
                        let offset = self
                            .constant_value(index)
                            .and_then(|i| i.checked_mul(element_size));
                        Self::nested(&parent, array_ty, offset)
                    }
                    None => PointerTargetPattern::any(),
                }
            }
            ExprKind::Cast(inner) => self.pattern_for(inner),
            _ => PointerTargetPattern::any(),
        }
    }

    /// Pattern for a sub-object at `proper_offset` inside `container`, the
    /// object matched by `parent`
    fn nested(
        parent: &PointerTargetPattern,
        container: CanonicalType,
        proper_offset: Option<u64>,
    ) -> PointerTargetPattern {
        let mut pattern = PointerTargetPattern::any();
        pattern.set_base(parent.base().map(str::to_string));
        pattern.set_container_type(Some(container));
        pattern.set_container_offset(parent.offset());
        pattern.set_proper_offset(proper_offset);
        pattern
    }
}
