//! Encrypted payloads produced by the vault.

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::schema::TableSchema;
use crate::types::DataType;

/// Payload format version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// Name of the ciphertext entry in a batch row.
pub const ROW_DATA_COLUMN: &str = "RowData";

/// Name of the nonce entry echoed in a batch row.
pub const NONCE_COLUMN: &str = "Nonce";

/// Cipher parameters recorded alongside a single ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadMetadata {
    /// Algorithm name.
    pub algorithm: String,
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// PBKDF2 salt; empty for raw keys.
    pub salt: Vec<u8>,
    /// Nonce used for this ciphertext.
    pub nonce: Vec<u8>,
    /// Time of encryption.
    pub encrypted_at: DateTime<Utc>,
    /// Payload format version.
    pub format_version: u32,
}

impl PayloadMetadata {
    /// Rejects payloads written in a format this crate cannot read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for any version other than
    /// [`FORMAT_VERSION`].
    pub fn check_version(&self) -> Result<(), Error> {
        check_version(self.format_version)
    }
}

pub(crate) fn check_version(version: u32) -> Result<(), Error> {
    if version == FORMAT_VERSION {
        Ok(())
    } else {
        Err(Error::UnsupportedVersion { version, supported: FORMAT_VERSION })
    }
}

/// One encrypted row: its schema in clear, its values sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRow {
    /// Schema of the sealed row.
    pub schema: TableSchema,
    /// Cipher parameters.
    pub metadata: PayloadMetadata,
    /// Ciphertext with appended tag.
    pub ciphertext: Vec<u8>,
}

/// One encrypted scalar value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// Semantic type needed to rebuild the value.
    pub data_type: DataType,
    /// Ciphertext with appended tag.
    pub ciphertext: Vec<u8>,
    /// Cipher parameters.
    pub metadata: PayloadMetadata,
}

/// Rows sealed under one derived key with a nonce each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBatch {
    /// Algorithm name shared by every row.
    pub algorithm: String,
    /// PBKDF2 salt shared by every row.
    pub salt: Vec<u8>,
    /// PBKDF2 iteration count shared by every row.
    pub iterations: u32,
    /// Sealed rows in input order.
    pub rows: Vec<EncryptedBatchRow>,
}

impl EncryptedBatch {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of an [`EncryptedBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBatchRow {
    /// Schema of the sealed row.
    pub schema: TableSchema,
    /// Nonce used for this row.
    pub nonce: Vec<u8>,
    /// Time of encryption.
    pub encrypted_at: DateTime<Utc>,
    /// Payload format version.
    pub format_version: u32,
    /// Ciphertext with appended tag.
    pub ciphertext: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_current_version_is_accepted() {
        assert!(check_version(FORMAT_VERSION).is_ok());
        assert!(matches!(
            check_version(2),
            Err(Error::UnsupportedVersion { version: 2, supported: 1 })
        ));
    }
}
