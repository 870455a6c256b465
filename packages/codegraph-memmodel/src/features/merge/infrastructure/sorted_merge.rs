//! Key-wise merging of persistent maps and lists
//!
//! Identical inputs (same physical tree) are returned as they are, so
//! merging a snapshot with a copy of itself keeps all sharing.

use im::{OrdMap, OrdSet, Vector};

/// Result of merging two maps, with the entries each side alone contributed
#[derive(Debug, Clone)]
pub struct SplitMerge<K: Ord + Clone, V: Clone> {
    pub merged: OrdMap<K, V>,
    pub only_in_first: OrdMap<K, V>,
    pub only_in_second: OrdMap<K, V>,
}

/// Union of `first` and `second`; keys bound to different values on the two
/// sides are resolved by `resolve(key, first_value, second_value)`
pub fn split_merge<K, V, F>(first: &OrdMap<K, V>, second: &OrdMap<K, V>, mut resolve: F) -> SplitMerge<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
    F: FnMut(&K, &V, &V) -> V,
{
    if first.ptr_eq(second) {
        return SplitMerge {
            merged: first.clone(),
            only_in_first: OrdMap::new(),
            only_in_second: OrdMap::new(),
        };
    }
    let mut merged = first.clone();
    let mut only_in_first = OrdMap::new();
    let mut only_in_second = OrdMap::new();
    for (key, value) in first.iter() {
        if !second.contains_key(key) {
            only_in_first.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in second.iter() {
        match first.get(key) {
            None => {
                only_in_second.insert(key.clone(), value.clone());
                merged.insert(key.clone(), value.clone());
            }
            Some(existing) if existing == value => {}
            Some(existing) => {
                let resolved = resolve(key, existing, value);
                merged.insert(key.clone(), resolved);
            }
        }
    }
    SplitMerge {
        merged,
        only_in_first,
        only_in_second,
    }
}

/// Union of two maps, see [`split_merge`]
pub fn merge_maps<K, V, F>(first: &OrdMap<K, V>, second: &OrdMap<K, V>, resolve: F) -> OrdMap<K, V>
where
    K: Ord + Clone,
    V: Clone + PartialEq,
    F: FnMut(&K, &V, &V) -> V,
{
    split_merge(first, second, resolve).merged
}

pub fn merge_sets<T: Ord + Clone>(first: &OrdSet<T>, second: &OrdSet<T>) -> OrdSet<T> {
    if first.ptr_eq(second) {
        return first.clone();
    }
    first.clone().union(second.clone())
}

/// Sorted union of two lists, the same whichever side comes first
pub fn merge_vectors<T: Clone + Ord>(first: &Vector<T>, second: &Vector<T>) -> Vector<T> {
    if first.ptr_eq(second) {
        return first.clone();
    }
    let mut merged: Vec<T> = first.iter().chain(second.iter()).cloned().collect();
    merged.sort();
    merged.dedup();
    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, i32)]) -> OrdMap<String, i32> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_split_merge_partitions_keys() {
        let a = map(&[("x", 1), ("y", 2)]);
        let b = map(&[("y", 3), ("z", 4)]);
        let split = split_merge(&a, &b, |_, l, r| l + r);
        assert_eq!(split.merged, map(&[("x", 1), ("y", 5), ("z", 4)]));
        assert_eq!(split.only_in_first, map(&[("x", 1)]));
        assert_eq!(split.only_in_second, map(&[("z", 4)]));
    }

    #[test]
    fn test_equal_values_are_not_resolved() {
        let a = map(&[("x", 1)]);
        let b = map(&[("x", 1)]);
        let split = split_merge(&a, &b, |_, _, _| panic!("no conflict expected"));
        assert_eq!(split.merged, a);
    }

    #[test]
    fn test_identical_maps_stay_shared() {
        let a = map(&[("x", 1)]);
        let copy = a.clone();
        assert!(merge_maps(&a, &copy, |_, l, _| *l).ptr_eq(&a));
    }

    #[test]
    fn test_merge_vectors_deduplicates() {
        let a: Vector<i32> = vec![1, 2].into_iter().collect();
        let b: Vector<i32> = vec![2, 3].into_iter().collect();
        let merged = merge_vectors(&a, &b);
        assert_eq!(merged.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_vectors_ignores_argument_order() {
        let a: Vector<i32> = vec![4, 1].into_iter().collect();
        let b: Vector<i32> = vec![3, 1, 2].into_iter().collect();
        assert_eq!(merge_vectors(&a, &b), merge_vectors(&b, &a));
        assert_eq!(merge_vectors(&b, &a).iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
