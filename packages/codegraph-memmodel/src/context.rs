//! Encoder context
//!
//! Owns what would otherwise be process-wide state: the validated
//! configuration, the layout cache, the counter naming synthetic allocation
//! bases and the set of variables whose address is taken. One context is
//! shared by reference across all workers of one analysis.

use crate::config::{EncoderConfig, Validatable};
use crate::errors::Result;
use crate::features::formula::{Formula, Sort};
use crate::features::type_layout::{MachineModel, TypeLayout};
use crate::shared::models::CanonicalType;
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of the variable holding the start address of a base
pub const ADDRESS_PREFIX: &str = "__ADDRESS_OF_";

#[derive(Debug)]
pub struct EncoderContext {
    config: EncoderConfig,
    layout: TypeLayout,
    allocation_counter: AtomicU64,
    addressed_variables: FxHashSet<String>,
}

impl EncoderContext {
    pub fn new(config: EncoderConfig) -> Result<Self> {
        let config = config.validated()?;
        let layout = TypeLayout::new(
            MachineModel::from_kind(config.machine_model),
            config.max_array_length,
        );
        Ok(Self {
            config,
            layout,
            allocation_counter: AtomicU64::new(0),
            addressed_variables: FxHashSet::default(),
        })
    }

    /// Context over the default configuration
    pub fn with_defaults() -> Self {
        let config = EncoderConfig::default();
        Self {
            layout: TypeLayout::new(
                MachineModel::from_kind(config.machine_model),
                config.max_array_length,
            ),
            config,
            allocation_counter: AtomicU64::new(0),
            addressed_variables: FxHashSet::default(),
        }
    }

    /// Variables whose address is taken somewhere in the program
    pub fn with_addressed_variables<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addressed_variables
            .extend(names.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> &TypeLayout {
        &self.layout
    }

    #[inline]
    pub fn is_addressed(&self, name: &str) -> bool {
        self.addressed_variables.contains(name)
    }

    /// Fresh number for a synthetic base name
    #[inline]
    pub fn next_allocation_id(&self) -> u64 {
        self.allocation_counter.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn pointer_sort(&self) -> Sort {
        Sort::BitVec(self.layout.pointer_bits())
    }

    /// Sort of a value of type `ty` stored in memory
    #[inline]
    pub fn value_sort(&self, ty: &CanonicalType) -> Sort {
        Sort::BitVec(self.layout.bit_width(ty))
    }

    #[inline]
    pub fn size_of(&self, ty: &CanonicalType) -> u64 {
        self.layout.size_of(ty)
    }

    /// Pointer-width constant
    #[inline]
    pub fn offset(&self, value: u64) -> Formula {
        Formula::bv(value as i128, self.layout.pointer_bits())
    }

    /// Name of the variable holding the start address of base `name`
    pub fn base_address_name(name: &str) -> String {
        format!("{}{}", ADDRESS_PREFIX, name)
    }

    /// Start address of base `name`
    pub fn base_address(&self, name: &str) -> Formula {
        Formula::var(Self::base_address_name(name), self.pointer_sort())
    }

    /// Address `offset` bytes into base `name`
    pub fn target_address(&self, name: &str, offset: u64) -> Formula {
        Formula::add(self.base_address(name), self.offset(offset))
    }
}

impl Default for EncoderContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}
