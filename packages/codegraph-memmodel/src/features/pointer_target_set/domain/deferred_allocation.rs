//! Deferred allocation pools
//!
//! An allocation whose result is only held in `void *` variables has no
//! element type yet. The pool records which pointer variables alias it and
//! which synthetic base names stand for the memory, until a typed use
//! reveals what lives there.

use im::Vector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredAllocationPool {
    pointer_variables: Vector<String>,
    base_variables: Vector<String>,
    is_zeroing: bool,
    /// Byte size when the allocation size was a constant
    size: Option<u64>,
}

impl DeferredAllocationPool {
    pub fn new(
        pointer_variable: impl Into<String>,
        is_zeroing: bool,
        size: Option<u64>,
        base_variable: impl Into<String>,
    ) -> Self {
        Self {
            pointer_variables: Vector::unit(pointer_variable.into()),
            base_variables: Vector::unit(base_variable.into()),
            is_zeroing,
            size,
        }
    }

    #[inline]
    pub fn pointer_variables(&self) -> &Vector<String> {
        &self.pointer_variables
    }

    #[inline]
    pub fn base_variables(&self) -> &Vector<String> {
        &self.base_variables
    }

    #[inline]
    pub fn is_zeroing(&self) -> bool {
        self.is_zeroing
    }

    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// A pointer variable per base name means nothing aliases the pool yet
    pub fn is_temporary(&self) -> bool {
        self.pointer_variables
            .iter()
            .all(|p| self.base_variables.contains(p))
    }

    pub fn with_pointer(&self, pointer: impl Into<String>) -> Self {
        let pointer = pointer.into();
        let mut result = self.clone();
        if !result.pointer_variables.contains(&pointer) {
            result.pointer_variables.push_back(pointer);
        }
        result
    }

    pub fn without_pointer(&self, pointer: &str) -> Self {
        let mut result = self.clone();
        result.pointer_variables.retain(|p| p != pointer);
        result
    }

    /// Union of two pools describing the same allocation on two paths
    ///
    /// The merged pool zero-fills only if both sides do. The size survives
    /// only if both sides agree on it. Both name lists come out sorted.
    pub fn merge_with(&self, other: &DeferredAllocationPool) -> Self {
        let mut pointer_variables = self.pointer_variables.clone();
        for p in other.pointer_variables.iter() {
            if !pointer_variables.contains(p) {
                pointer_variables.push_back(p.clone());
            }
        }
        let mut base_variables = self.base_variables.clone();
        for b in other.base_variables.iter() {
            if !base_variables.contains(b) {
                base_variables.push_back(b.clone());
            }
        }
        pointer_variables.sort();
        base_variables.sort();
        let size = match (self.size, other.size) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        };
        Self {
            pointer_variables,
            base_variables,
            is_zeroing: self.is_zeroing && other.is_zeroing,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_bookkeeping() {
        let pool = DeferredAllocationPool::new("main::p", false, Some(8), "__alloc_0");
        let aliased = pool.with_pointer("main::q").with_pointer("main::q");
        assert_eq!(aliased.pointer_variables().len(), 2);
        let back = aliased.without_pointer("main::p");
        assert_eq!(back.pointer_variables().iter().collect::<Vec<_>>(), vec!["main::q"]);
        assert_eq!(pool.pointer_variables().len(), 1);
    }

    #[test]
    fn test_temporary_pool() {
        let pool = DeferredAllocationPool::new("__alloc_3", true, None, "__alloc_3");
        assert!(pool.is_temporary());
        assert!(!pool.with_pointer("main::p").is_temporary());
    }

    #[test]
    fn test_merge_with() {
        let a = DeferredAllocationPool::new("main::p", true, Some(8), "__alloc_0");
        let b = DeferredAllocationPool::new("main::q", false, Some(8), "__alloc_1");
        let merged = a.merge_with(&b);
        assert_eq!(merged.pointer_variables().len(), 2);
        assert_eq!(merged.base_variables().len(), 2);
        assert!(!merged.is_zeroing());
        assert_eq!(merged.size(), Some(8));
        assert_eq!(b.merge_with(&a), merged);

        let c = DeferredAllocationPool::new("main::p", true, Some(4), "__alloc_0");
        assert_eq!(a.merge_with(&c).size(), None);
        assert!(a.merge_with(&c).is_zeroing());

        let d = DeferredAllocationPool::new("main::p", true, None, "__alloc_0");
        assert_eq!(a.merge_with(&d).size(), None);
    }
}
