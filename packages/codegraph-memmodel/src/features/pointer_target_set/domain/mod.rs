mod composite_field;
mod deferred_allocation;
mod snapshot;

pub use composite_field::CompositeField;
pub use deferred_allocation::DeferredAllocationPool;
pub use snapshot::{base_ordering, is_fake_base_type, PointerTargetSet};
