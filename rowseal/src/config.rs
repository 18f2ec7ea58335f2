//! Vault configuration.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::payload::FORMAT_VERSION;

/// Tunables for a [`Vault`](crate::vault::Vault).
///
/// Missing fields take their defaults when deserialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Widest row accepted for encryption.
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,

    /// Rows processed per chunk in batch operations.
    #[serde(default = "default_batch_chunk_size")]
    pub batch_chunk_size: usize,

    /// Payload format version to write.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

const fn default_max_columns() -> usize {
    1000
}
const fn default_batch_chunk_size() -> usize {
    100
}
const fn default_format_version() -> u32 {
    FORMAT_VERSION
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            max_columns: default_max_columns(),
            batch_chunk_size: default_batch_chunk_size(),
            format_version: default_format_version(),
        }
    }
}

impl VaultConfig {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for zero limits and
    /// [`Error::UnsupportedVersion`] for a format version this crate cannot
    /// write.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_columns == 0 {
            return Err(Error::InvalidArgument("max_columns must be > 0".into()));
        }
        if self.batch_chunk_size == 0 {
            return Err(Error::InvalidArgument("batch_chunk_size must be > 0".into()));
        }
        crate::payload::check_version(self.format_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let cfg = VaultConfig::default();
        assert_eq!(cfg.max_columns, 1000);
        assert_eq!(cfg.batch_chunk_size, 100);
        assert_eq!(cfg.format_version, 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let cfg = VaultConfig { max_columns: 0, ..VaultConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = VaultConfig { batch_chunk_size: 0, ..VaultConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_format_version() {
        let cfg = VaultConfig { format_version: 2, ..VaultConfig::default() };
        assert!(matches!(cfg.validate(), Err(Error::UnsupportedVersion { .. })));
    }
}
