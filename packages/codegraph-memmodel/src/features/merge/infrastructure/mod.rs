mod sorted_merge;

pub use sorted_merge::{merge_maps, merge_sets, merge_vectors, split_merge, SplitMerge};
