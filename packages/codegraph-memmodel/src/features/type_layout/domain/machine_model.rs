//! Target data layout parameters

use crate::config::MachineModelKind;
use crate::shared::models::BasicType;
use serde::{Deserialize, Serialize};

/// Sizes and alignments of the basic C types, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineModel {
    pub kind: MachineModelKind,
    pub sizeof_short: u64,
    pub sizeof_int: u64,
    pub sizeof_long: u64,
    pub sizeof_long_long: u64,
    pub sizeof_float: u64,
    pub sizeof_double: u64,
    pub sizeof_pointer: u64,
    pub alignof_long_long: u64,
    pub alignof_double: u64,
}

impl MachineModel {
    pub fn linux32() -> Self {
        Self {
            kind: MachineModelKind::Linux32,
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long: 4,
            sizeof_long_long: 8,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_pointer: 4,
            alignof_long_long: 4,
            alignof_double: 4,
        }
    }

    pub fn linux64() -> Self {
        Self {
            kind: MachineModelKind::Linux64,
            sizeof_short: 2,
            sizeof_int: 4,
            sizeof_long: 8,
            sizeof_long_long: 8,
            sizeof_float: 4,
            sizeof_double: 8,
            sizeof_pointer: 8,
            alignof_long_long: 8,
            alignof_double: 8,
        }
    }

    pub fn from_kind(kind: MachineModelKind) -> Self {
        match kind {
            MachineModelKind::Linux32 => Self::linux32(),
            MachineModelKind::Linux64 => Self::linux64(),
        }
    }

    /// `void` occupies one byte, as in GNU C pointer arithmetic
    pub fn size_of_basic(&self, basic: BasicType) -> u64 {
        match basic {
            BasicType::Void | BasicType::Bool | BasicType::Char => 1,
            BasicType::Short => self.sizeof_short,
            BasicType::Int => self.sizeof_int,
            BasicType::Long => self.sizeof_long,
            BasicType::LongLong => self.sizeof_long_long,
            BasicType::Float => self.sizeof_float,
            BasicType::Double => self.sizeof_double,
        }
    }

    pub fn align_of_basic(&self, basic: BasicType) -> u64 {
        match basic {
            BasicType::LongLong => self.alignof_long_long,
            BasicType::Double => self.alignof_double,
            other => self.size_of_basic(other),
        }
    }

    #[inline]
    pub fn pointer_bits(&self) -> u32 {
        (self.sizeof_pointer * 8) as u32
    }
}

impl Default for MachineModel {
    fn default() -> Self {
        Self::linux64()
    }
}
