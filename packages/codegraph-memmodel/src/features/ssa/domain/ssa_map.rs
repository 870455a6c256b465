//! SSA index map
//!
//! Index convention: `0` is the sentinel for "never written" and denotes the
//! implicit initial version of a name. The first write produces index `1`,
//! every further write increments by exactly one.
//!
//! Each entry remembers the C type of the name so that branch merging can
//! build re-versioning equalities of the right sort.

use crate::shared::models::CanonicalType;
use im::OrdMap;
use serde::{Deserialize, Serialize};

/// Index returned for names that were never written
pub const UNSET_INDEX: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SsaEntry {
    index: u32,
    ty: CanonicalType,
}

/// A name whose index differs between two maps
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SsaDifference {
    pub name: String,
    pub ty: CanonicalType,
    pub left: u32,
    pub right: u32,
}

/// Persistent map from variable / UF names to their current SSA index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsaMap {
    entries: OrdMap<String, SsaEntry>,
}

impl SsaMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Current index, `UNSET_INDEX` when never written
    #[inline]
    pub fn get_index(&self, name: &str) -> u32 {
        self.entries.get(name).map_or(UNSET_INDEX, |e| e.index)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get_type(&self, name: &str) -> Option<&CanonicalType> {
        self.entries.get(name).map(|e| &e.ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e.index))
    }

    pub fn builder(&self) -> SsaMapBuilder {
        SsaMapBuilder {
            entries: self.entries.clone(),
        }
    }

    /// Pointwise maximum of two maps, with the names whose indices differ
    pub fn merge(&self, other: &SsaMap) -> (SsaMap, Vec<SsaDifference>) {
        let mut merged = self.entries.clone();
        let mut differences = Vec::new();
        for (name, theirs) in other.entries.iter() {
            let ours = self.get_index(name);
            if ours != theirs.index {
                differences.push(SsaDifference {
                    name: name.clone(),
                    ty: theirs.ty.clone(),
                    left: ours,
                    right: theirs.index,
                });
            }
            if theirs.index > ours {
                merged.insert(name.clone(), theirs.clone());
            }
        }
        for (name, ours) in self.entries.iter() {
            if !other.contains(name) {
                differences.push(SsaDifference {
                    name: name.clone(),
                    ty: ours.ty.clone(),
                    left: ours.index,
                    right: UNSET_INDEX,
                });
            }
        }
        differences.sort();
        (SsaMap { entries: merged }, differences)
    }
}

/// Working copy of an `SsaMap` used while translating one edge
#[derive(Debug, Clone)]
pub struct SsaMapBuilder {
    entries: OrdMap<String, SsaEntry>,
}

impl SsaMapBuilder {
    #[inline]
    pub fn get_index(&self, name: &str) -> u32 {
        self.entries.get(name).map_or(UNSET_INDEX, |e| e.index)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Index the next write of `name` will produce
    #[inline]
    pub fn next_index(&self, name: &str) -> u32 {
        self.get_index(name) + 1
    }

    pub fn set_index(&mut self, name: impl Into<String>, ty: &CanonicalType, index: u32) {
        let name = name.into();
        debug_assert!(
            index >= self.get_index(&name),
            "SSA index of '{}' must not decrease",
            name
        );
        self.entries.insert(
            name,
            SsaEntry {
                index,
                ty: ty.clone(),
            },
        );
    }

    /// Record one write of `name`, returning the new index
    pub fn bump(&mut self, name: impl Into<String>, ty: &CanonicalType) -> u32 {
        let name = name.into();
        let next = self.get_index(&name) + 1;
        self.entries.insert(
            name,
            SsaEntry {
                index: next,
                ty: ty.clone(),
            },
        );
        next
    }

    pub fn build(self) -> SsaMap {
        SsaMap {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> CanonicalType {
        CanonicalType::int()
    }

    #[test]
    fn test_unset_is_distinct_from_first_write() {
        let ssa = SsaMap::empty();
        assert_eq!(ssa.get_index("x"), UNSET_INDEX);
        assert!(!ssa.contains("x"));

        let mut builder = ssa.builder();
        assert_eq!(builder.bump("x", &int()), 1);
        let ssa = builder.build();
        assert_eq!(ssa.get_index("x"), 1);
        assert!(ssa.contains("x"));
        assert_eq!(ssa.get_type("x"), Some(&int()));
    }

    #[test]
    fn test_builder_does_not_touch_source() {
        let mut builder = SsaMap::empty().builder();
        builder.bump("x", &int());
        let first = builder.build();

        let mut builder = first.builder();
        builder.bump("x", &int());
        builder.bump("y", &int());
        let second = builder.build();

        assert_eq!(first.get_index("x"), 1);
        assert_eq!(second.get_index("x"), 2);
        assert_eq!(second.get_index("y"), 1);
    }

    #[test]
    fn test_merge_takes_maximum() {
        let mut a = SsaMap::empty().builder();
        a.set_index("x", &int(), 3);
        a.set_index("y", &int(), 1);
        let a = a.build();

        let mut b = SsaMap::empty().builder();
        b.set_index("x", &int(), 1);
        b.set_index("z", &int(), 2);
        let b = b.build();

        let (merged, diffs) = a.merge(&b);
        assert_eq!(merged.get_index("x"), 3);
        assert_eq!(merged.get_index("y"), 1);
        assert_eq!(merged.get_index("z"), 2);
        let summary: Vec<_> = diffs
            .iter()
            .map(|d| (d.name.as_str(), d.left, d.right))
            .collect();
        assert_eq!(summary, vec![("x", 3, 1), ("y", 1, 0), ("z", 0, 2)]);
    }
}
