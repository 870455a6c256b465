//! Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric parameter outside its admissible bounds
    #[error("{field} = {value} is outside {min}..={max} ({hint})")]
    Range {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
        hint: &'static str,
    },

    #[error("unknown preset '{0}', expected fast, balanced or thorough")]
    UnknownPreset(String),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Parameters that are fine alone but contradict each other
    #[error("inconsistent configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn out_of_range(field: &'static str, value: u64, min: u64, max: u64, hint: &'static str) -> Self {
        Self::Range {
            field,
            value,
            min,
            max,
            hint,
        }
    }
}
