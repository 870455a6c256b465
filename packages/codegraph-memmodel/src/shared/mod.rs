//! Shared module - types used across all features

pub mod models;

pub use models::*;
