pub mod layout_cache;

pub use layout_cache::TypeLayout;
