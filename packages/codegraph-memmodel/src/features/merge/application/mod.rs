mod merge_engine;

pub use merge_engine::{
    MergeEngine, MergeResult, FAKE_ALLOCATION_PREFIX, UNITED_BASE_PREFIX, UNITED_FIELD_PREFIX,
};
