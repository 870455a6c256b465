//! Configuration validation

use super::error::ConfigResult;

/// Configuration checked before an encoder context accepts it
pub trait Validatable: Sized {
    fn validate(&self) -> ConfigResult<()>;

    /// Name used in cross-field error messages
    fn config_name(&self) -> &'static str;

    /// Pass the configuration through if it validates
    fn validated(self) -> ConfigResult<Self> {
        self.validate()?;
        Ok(self)
    }
}
