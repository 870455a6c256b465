//! Preset configurations
//!
//! Presets trade precision of the heap model against formula size.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Small models: arrays unrolled to 4 elements, retention capped at 64 targets per type
    Fast,

    /// Default: arrays unrolled to 16 elements, unbounded retention
    Balanced,

    /// Arrays unrolled to 64 elements, unbounded retention
    Thorough,
}

impl Preset {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }

    /// Number of array elements unrolled during target generation
    pub fn max_array_length(&self) -> u64 {
        match self {
            Self::Fast => 4,
            Self::Balanced => 16,
            Self::Thorough => 64,
        }
    }

    /// Per-type retention cap
    pub fn max_retention_targets(&self) -> Option<usize> {
        match self {
            Self::Fast => Some(64),
            Self::Balanced | Self::Thorough => None,
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_roundtrip_names() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
            assert_eq!(preset.as_str().parse::<Preset>().ok(), Some(preset));
        }
        assert_eq!("FAST".parse::<Preset>().ok(), Some(Preset::Fast));
        assert!(matches!(
            "custom".parse::<Preset>(),
            Err(ConfigError::UnknownPreset(name)) if name == "custom"
        ));
    }

    #[test]
    fn test_preset_defaults() {
        assert_eq!(Preset::default(), Preset::Balanced);
        assert_eq!(Preset::Balanced.max_array_length(), 16);
        assert!(Preset::Fast.max_retention_targets().is_some());
    }
}
