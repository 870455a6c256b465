//! Encoder configuration
//!
//! Parameters of the heap model: target data layout, unrolling bounds,
//! allocation modeling and the retention cap.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target data layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineModelKind {
    /// ILP32: 4-byte pointers and longs
    Linux32,
    /// LP64: 8-byte pointers and longs
    Linux64,
}

impl Default for MachineModelKind {
    fn default() -> Self {
        Self::Linux64
    }
}

/// Memory-model encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Target data layout
    pub machine_model: MachineModelKind,

    /// Array elements unrolled during target generation, and the length
    /// assumed for arrays without a declared length (1..=4096)
    pub max_array_length: u64,

    /// Size in bytes assumed for allocations of unknown size (1..=1048576)
    pub default_allocation_size: u64,

    /// Whether allocation calls may never return null
    pub allocations_always_succeed: bool,

    /// Untyped allocators returning uninitialized memory
    pub allocation_functions: Vec<String>,

    /// Untyped allocators returning zeroed memory
    pub zeroing_allocation_functions: Vec<String>,

    /// Deallocators (encoded as no-ops)
    pub deallocation_functions: Vec<String>,

    /// Prefix of functions returning a nondeterministic value
    pub nondet_function_prefix: String,

    /// Maximum targets of one type a single write emits retention for.
    /// `None` means unbounded.
    pub max_retention_targets: Option<usize>,
}

fn default_allocation_functions() -> Vec<String> {
    ["malloc", "__kmalloc", "kmalloc", "alloca"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_zeroing_allocation_functions() -> Vec<String> {
    vec!["calloc".to_string(), "kzalloc".to_string()]
}
fn default_deallocation_functions() -> Vec<String> {
    vec!["free".to_string()]
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

impl EncoderConfig {
    /// Create config from preset
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            machine_model: MachineModelKind::default(),
            max_array_length: preset.max_array_length(),
            default_allocation_size: 4,
            allocations_always_succeed: true,
            allocation_functions: default_allocation_functions(),
            zeroing_allocation_functions: default_zeroing_allocation_functions(),
            deallocation_functions: default_deallocation_functions(),
            nondet_function_prefix: "__VERIFIER_nondet_".to_string(),
            max_retention_targets: preset.max_retention_targets(),
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_array_length == 0 || self.max_array_length > 4096 {
            return Err(ConfigError::out_of_range(
                "max_array_length",
                self.max_array_length,
                1,
                4096,
                "every array needs at least one unrolled element",
            ));
        }

        if self.default_allocation_size == 0 || self.default_allocation_size > 1 << 20 {
            return Err(ConfigError::out_of_range(
                "default_allocation_size",
                self.default_allocation_size,
                1,
                1 << 20,
                "allocation slots occupy at least one byte",
            ));
        }

        if self.max_retention_targets == Some(0) {
            return Err(ConfigError::out_of_range(
                "max_retention_targets",
                0,
                1,
                u64::MAX,
                "use null for an unbounded cap",
            ));
        }

        if let Some(name) = self
            .allocation_functions
            .iter()
            .find(|name| self.zeroing_allocation_functions.contains(name))
        {
            return Err(ConfigError::Validation(format!(
                "{}: '{}' is listed as both a plain and a zeroing allocator",
                self.config_name(),
                name
            )));
        }

        Ok(())
    }

    /// Whether `name` allocates untyped memory; the flag tells if it is zeroed
    pub fn allocation_kind(&self, name: &str) -> Option<bool> {
        if self.allocation_functions.iter().any(|f| f == name) {
            Some(false)
        } else if self.zeroing_allocation_functions.iter().any(|f| f == name) {
            Some(true)
        } else {
            None
        }
    }

    pub fn is_deallocation(&self, name: &str) -> bool {
        self.deallocation_functions.iter().any(|f| f == name)
    }

    pub fn is_nondet_function(&self, name: &str) -> bool {
        !self.nondet_function_prefix.is_empty() && name.starts_with(&self.nondet_function_prefix)
    }

    // Builder methods

    pub fn machine_model(mut self, kind: MachineModelKind) -> Self {
        self.machine_model = kind;
        self
    }

    pub fn max_array_length(mut self, length: u64) -> Self {
        self.max_array_length = length;
        self
    }

    pub fn default_allocation_size(mut self, size: u64) -> Self {
        self.default_allocation_size = size;
        self
    }

    pub fn allocations_always_succeed(mut self, enable: bool) -> Self {
        self.allocations_always_succeed = enable;
        self
    }

    pub fn max_retention_targets(mut self, cap: Option<usize>) -> Self {
        self.max_retention_targets = cap;
        self
    }
}

impl Validatable for EncoderConfig {
    fn validate(&self) -> ConfigResult<()> {
        EncoderConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "EncoderConfig"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EncoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_array_length, 16);
        assert_eq!(config.default_allocation_size, 4);
        assert_eq!(config.machine_model, MachineModelKind::Linux64);
    }

    #[test]
    fn test_range_validation() {
        let config = EncoderConfig::default().max_array_length(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Range {
                field: "max_array_length",
                value: 0,
                ..
            })
        ));

        let config = EncoderConfig::default().max_retention_targets(Some(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allocator_overlap_rejected() {
        let mut config = EncoderConfig::default();
        config.zeroing_allocation_functions.push("malloc".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = "machine_model: linux32\nmax_array_length: 8\n";
        let config = EncoderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.machine_model, MachineModelKind::Linux32);
        assert_eq!(config.max_array_length, 8);
        assert_eq!(config.allocation_kind("calloc"), Some(true));
        assert_eq!(config.allocation_kind("malloc"), Some(false));
        assert_eq!(config.allocation_kind("printf"), None);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = EncoderConfig::from_preset(Preset::Fast);
        let yaml = config.to_yaml().unwrap();
        let parsed = EncoderConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.max_array_length, 4);
        assert_eq!(parsed.max_retention_targets, Some(64));
    }

    #[test]
    fn test_yaml_invalid_value_rejected() {
        assert!(EncoderConfig::from_yaml_str("max_array_length: 0\n").is_err());
        assert!(matches!(
            EncoderConfig::from_yaml_str("machine_model: [1, 2]\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
