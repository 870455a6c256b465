//! Common test utilities for codegraph-memmodel
//!
//! Builders for edges and expressions used by the integration tests.

#![allow(dead_code)]

mod builders;

pub use builders::*;
