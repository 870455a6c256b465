//! Encoder configuration
//!
//! Two tiers:
//! - Preset: `EncoderConfig::from_preset(Preset::Fast)`
//! - YAML: `EncoderConfig::from_yaml_file("memmodel.yaml")?`
//!
//! # Examples
//!
//! ```rust,ignore
//! use codegraph_memmodel::config::{EncoderConfig, MachineModelKind, Preset};
//!
//! let config = EncoderConfig::from_preset(Preset::Balanced)
//!     .machine_model(MachineModelKind::Linux32)
//!     .max_retention_targets(Some(256));
//! config.validate()?;
//! ```

pub mod encoder_config;
pub mod error;
pub mod preset;
pub mod validation;

// Re-exports
pub use encoder_config::{EncoderConfig, MachineModelKind};
pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use validation::Validatable;
