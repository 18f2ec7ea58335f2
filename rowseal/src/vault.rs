//! Vault for row, batch and value encryption.
//!
//! Rows are serialised through the tabular codec, sealed with AES-256-GCM
//! under a key derived from the caller's metadata, and wrapped in a payload
//! that keeps the schema and nonce in clear.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretVec};
use zeroize::Zeroizing;

use crate::cipher::{self, NONCE_SIZE};
use crate::codec;
use crate::config::VaultConfig;
use crate::error::Error;
use crate::logging::{EngineLogger, TracingLogger};
use crate::metadata::EncryptionMetadata;
use crate::payload::{
    check_version, EncryptedBatch, EncryptedBatchRow, EncryptedRow, EncryptedValue,
    PayloadMetadata,
};
use crate::schema::{Row, TableSchema};
use crate::types::{decode_base64, DataType, Value};

/// Column name reported for conversion failures of a single value.
const VALUE_COLUMN: &str = "value";

/// Vault for encryption and decryption operations.
///
/// Stateless apart from its configuration; one vault can serve any number of
/// threads. Every derived key and generated nonce is zeroed when dropped.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rowseal::prelude::*;
///
/// # fn main() -> Result<(), Error> {
/// let schema = Arc::new(TableSchema::new([
///     ColumnSchema::new("id_no", DataType::Text).with_max_length(13),
///     ColumnSchema::new("age", DataType::Int32),
/// ])?);
/// let row = Row::new(schema, vec!["1234567890123".into(), 30.into()])?;
///
/// let vault = Vault::default();
/// let metadata = EncryptionMetadata::with_password("test123", vec![0u8; 16]);
///
/// let (payload, _nonce) = vault.encrypt_row(&row, &metadata)?;
/// let decrypted = vault.decrypt_row(&payload, &metadata)?;
/// assert_eq!(decrypted, row);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Vault {
    config: VaultConfig,
    logger: Arc<dyn EngineLogger>,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new(VaultConfig::default())
    }
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Vault {
    /// Creates a vault that logs through `tracing`.
    #[must_use]
    pub fn new(config: VaultConfig) -> Self {
        Self { config, logger: Arc::new(TracingLogger) }
    }

    /// Replaces the lifecycle logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn EngineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The vault's configuration.
    #[must_use]
    pub const fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Validates metadata, logging advisories.
    ///
    /// Returns the advisories on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every reason and advisory when the
    /// metadata is unusable.
    pub fn validate_metadata(
        &self,
        metadata: &EncryptionMetadata,
        ignore_nonce: bool,
    ) -> Result<Vec<String>, Error> {
        let report = metadata.validate(ignore_nonce);
        for warning in &report.warnings {
            self.logger.warn(warning);
        }
        report.into_result()
    }

    /// Encrypts one row.
    ///
    /// Returns the payload and the nonce that was used. The nonce is also
    /// stored in the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for bad metadata,
    /// [`Error::ColumnLimitExceeded`] for an over-wide row, codec errors for
    /// values that do not match their columns, and cipher errors.
    pub fn encrypt_row(
        &self,
        row: &Row,
        metadata: &EncryptionMetadata,
    ) -> Result<(EncryptedRow, Vec<u8>), Error> {
        self.observe("encrypt_row", || {
            self.validate_metadata(metadata, false)?;
            self.check_width(row)?;

            let plaintext = Zeroizing::new(codec::row_to_xml(row)?);
            let nonce = resolve_nonce(metadata)?;
            let key = metadata.derive_key()?;
            let ciphertext = cipher::encrypt(plaintext.as_bytes(), key.expose_secret(), &nonce)?;

            let payload = EncryptedRow {
                schema: TableSchema::clone(row.schema()),
                metadata: self.payload_metadata(metadata, nonce.to_vec()),
                ciphertext,
            };
            Ok((payload, nonce.to_vec()))
        })
    }

    /// Decrypts one row.
    ///
    /// The nonce stored in the payload is used; the metadata's nonce is a
    /// fallback for payloads without one.
    ///
    /// # Errors
    ///
    /// Cipher errors such as [`Error::AuthenticationFailed`] are returned as
    /// they are; later failures are wrapped in [`Error::RowDecryption`].
    pub fn decrypt_row(
        &self,
        payload: &EncryptedRow,
        metadata: &EncryptionMetadata,
    ) -> Result<Row, Error> {
        self.observe("decrypt_row", || {
            self.validate_metadata(metadata, true)?;
            payload.metadata.check_version()?;
            let key = metadata.derive_key()?;
            open_row(&payload.schema, &payload.metadata.nonce, &payload.ciphertext, metadata, &key)
        })
    }

    /// Encrypts many rows under one derived key, with a fresh nonce per row.
    ///
    /// Any nonce in `metadata` is ignored.
    ///
    /// # Errors
    ///
    /// The first failing row aborts the batch with [`Error::BatchRow`]
    /// carrying its index; no partial result is returned.
    pub fn encrypt_rows(
        &self,
        rows: &[Row],
        metadata: &EncryptionMetadata,
    ) -> Result<EncryptedBatch, Error> {
        self.observe("encrypt_rows", || {
            self.validate_metadata(metadata, true)?;
            let key = metadata.derive_key()?;

            let chunk_size = self.config.batch_chunk_size.max(1);
            let mut sealed = Vec::with_capacity(rows.len());
            for (chunk_index, chunk) in rows.chunks(chunk_size).enumerate() {
                for (offset, row) in chunk.iter().enumerate() {
                    let index = chunk_index * chunk_size + offset;
                    sealed.push(self.seal_batch_row(row, &key).map_err(|e| e.at_row(index))?);
                }
                tracing::debug!(sealed = sealed.len(), total = rows.len(), "batch chunk encrypted");
            }

            Ok(EncryptedBatch {
                algorithm: metadata.algorithm.clone(),
                salt: metadata.salt_bytes().to_vec(),
                iterations: metadata.iterations,
                rows: sealed,
            })
        })
    }

    /// Decrypts every row of a batch under one derived key.
    ///
    /// # Errors
    ///
    /// The first failing row aborts the batch with [`Error::BatchRow`]
    /// carrying its index; no partial result is returned.
    pub fn decrypt_rows(
        &self,
        batch: &EncryptedBatch,
        metadata: &EncryptionMetadata,
    ) -> Result<Vec<Row>, Error> {
        self.observe("decrypt_rows", || {
            self.validate_metadata(metadata, true)?;
            let key = metadata.derive_key()?;

            let chunk_size = self.config.batch_chunk_size.max(1);
            let mut opened = Vec::with_capacity(batch.rows.len());
            for (chunk_index, chunk) in batch.rows.chunks(chunk_size).enumerate() {
                for (offset, row) in chunk.iter().enumerate() {
                    let index = chunk_index * chunk_size + offset;
                    let result = check_version(row.format_version).and_then(|()| {
                        open_row(&row.schema, &row.nonce, &row.ciphertext, metadata, &key)
                    });
                    opened.push(result.map_err(|e| e.at_row(index))?);
                }
                tracing::debug!(opened = opened.len(), total = batch.rows.len(), "batch chunk decrypted");
            }
            Ok(opened)
        })
    }

    /// Encrypts one non-null value.
    ///
    /// Returns the payload and the nonce that was used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for [`Value::Null`], plus the
    /// errors of [`Vault::encrypt_row`].
    pub fn encrypt_value(
        &self,
        value: &Value,
        metadata: &EncryptionMetadata,
    ) -> Result<(EncryptedValue, Vec<u8>), Error> {
        self.observe("encrypt_value", || {
            let data_type = value
                .data_type()
                .ok_or_else(|| Error::InvalidArgument("cannot encrypt a null value".into()))?;
            self.validate_metadata(metadata, false)?;

            let plaintext = Zeroizing::new(value.to_canonical().unwrap_or_default());
            let nonce = resolve_nonce(metadata)?;
            let key = metadata.derive_key()?;
            let ciphertext = cipher::encrypt(plaintext.as_bytes(), key.expose_secret(), &nonce)?;

            let payload = EncryptedValue {
                data_type,
                ciphertext,
                metadata: self.payload_metadata(metadata, nonce.to_vec()),
            };
            Ok((payload, nonce.to_vec()))
        })
    }

    /// Decrypts one value, rebuilding it as its recorded type.
    ///
    /// # Errors
    ///
    /// Returns cipher errors, and [`crate::error::CodecError::Conversion`] if
    /// the plaintext does not read as the recorded type.
    pub fn decrypt_value(
        &self,
        payload: &EncryptedValue,
        metadata: &EncryptionMetadata,
    ) -> Result<Value, Error> {
        self.observe("decrypt_value", || {
            self.validate_metadata(metadata, true)?;
            payload.metadata.check_version()?;
            let key = metadata.derive_key()?;
            let nonce = select_nonce(&payload.metadata.nonce, metadata)?;
            let plaintext =
                Zeroizing::new(cipher::decrypt(&payload.ciphertext, key.expose_secret(), nonce)?);
            let text = plaintext_str(&plaintext)?;

            let value = match payload.data_type {
                DataType::Binary => decode_base64(text).map(Value::Binary).ok_or_else(|| {
                    crate::error::CodecError::Conversion {
                        column: VALUE_COLUMN.into(),
                        data_type: DataType::Binary.tag(),
                        value: text.to_string(),
                    }
                })?,
                data_type => {
                    Value::parse(data_type, text).map_err(|e| e.for_column(VALUE_COLUMN))?
                }
            };
            Ok(value)
        })
    }

    fn seal_batch_row(
        &self,
        row: &Row,
        key: &SecretVec<u8>,
    ) -> Result<EncryptedBatchRow, Error> {
        self.check_width(row)?;
        let plaintext = Zeroizing::new(codec::row_to_xml(row)?);
        let nonce = Zeroizing::new(cipher::generate_random(NONCE_SIZE)?);
        let ciphertext = cipher::encrypt(plaintext.as_bytes(), key.expose_secret(), &nonce)?;
        Ok(EncryptedBatchRow {
            schema: TableSchema::clone(row.schema()),
            nonce: nonce.to_vec(),
            encrypted_at: Utc::now(),
            format_version: self.config.format_version,
            ciphertext,
        })
    }

    fn check_width(&self, row: &Row) -> Result<(), Error> {
        let actual = row.schema().len();
        if actual > self.config.max_columns {
            return Err(Error::ColumnLimitExceeded { actual, max: self.config.max_columns });
        }
        Ok(())
    }

    fn payload_metadata(&self, metadata: &EncryptionMetadata, nonce: Vec<u8>) -> PayloadMetadata {
        PayloadMetadata {
            algorithm: metadata.algorithm.clone(),
            iterations: metadata.iterations,
            salt: metadata.salt_bytes().to_vec(),
            nonce,
            encrypted_at: Utc::now(),
            format_version: self.config.format_version,
        }
    }

    fn observe<T>(
        &self,
        operation: &str,
        f: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.logger.info(&format!("{operation}: started"));
        let result = f();
        match &result {
            Ok(_) => self.logger.info(&format!("{operation}: succeeded")),
            Err(e) => self.logger.error(&format!("{operation}: failed: {e}")),
        }
        result
    }
}

fn resolve_nonce(metadata: &EncryptionMetadata) -> Result<Zeroizing<Vec<u8>>, Error> {
    if metadata.auto_generate_nonce {
        return cipher::generate_random(NONCE_SIZE).map(Zeroizing::new);
    }
    metadata
        .nonce
        .clone()
        .map(Zeroizing::new)
        .ok_or_else(|| Error::InvalidArgument("no nonce supplied and auto-generation is off".into()))
}

fn select_nonce<'a>(
    embedded: &'a [u8],
    metadata: &'a EncryptionMetadata,
) -> Result<&'a [u8], Error> {
    if !embedded.is_empty() {
        return Ok(embedded);
    }
    metadata
        .nonce
        .as_deref()
        .ok_or_else(|| Error::InvalidArgument("payload carries no nonce and none was supplied".into()))
}

fn plaintext_str(plaintext: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(plaintext)
        .map_err(|e| Error::InvalidDocument(format!("plaintext is not UTF-8: {e}")))
}

fn open_row(
    schema: &TableSchema,
    nonce: &[u8],
    ciphertext: &[u8],
    metadata: &EncryptionMetadata,
    key: &SecretVec<u8>,
) -> Result<Row, Error> {
    let opened = (|| {
        let nonce = select_nonce(nonce, metadata)?;
        let plaintext = Zeroizing::new(cipher::decrypt(ciphertext, key.expose_secret(), nonce)?);
        codec::row_from_xml(&Arc::new(schema.clone()), plaintext_str(&plaintext)?)
    })();
    opened.map_err(Error::into_row_decryption)
}
