//! Error types for `RowSeal` operations.

use std::fmt;

/// Main error type for `RowSeal` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required input was missing or unusable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Row has more columns than the engine accepts
    #[error("row has {actual} columns (max: {max})")]
    ColumnLimitExceeded {
        /// Number of columns in the rejected row
        actual: usize,
        /// Configured column limit
        max: usize,
    },

    /// Encryption metadata failed policy checks
    #[error("{}", ValidationMessage(.errors, .warnings))]
    Validation {
        /// Reasons the metadata was rejected
        errors: Vec<String>,
        /// Non-fatal advisories collected alongside
        warnings: Vec<String>,
    },

    /// Key has the wrong size for the cipher
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length
        expected: usize,
        /// Supplied key length
        actual: usize,
    },

    /// Nonce has the wrong size for the cipher
    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength {
        /// Required nonce length
        expected: usize,
        /// Supplied nonce length
        actual: usize,
    },

    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The system random source failed
    #[error("random generation failed: {0}")]
    RandomGeneration(String),

    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption operation failed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Authentication tag verification failed (data may be corrupted or tampered)
    #[error("authentication failed: ciphertext may be corrupted or tampered")]
    AuthenticationFailed,

    /// Tabular codec failure
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A persisted document is missing structure or carries malformed fields
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Unsupported payload format version
    #[error("unsupported format version: {version} (supported: {supported})")]
    UnsupportedVersion {
        /// The version found in the payload
        version: u32,
        /// Supported version
        supported: u32,
    },

    /// A row inside a batch failed; the batch was aborted
    #[error("batch aborted at row {index}: {source}")]
    BatchRow {
        /// Zero-based index of the failing row
        index: usize,
        /// The row's failure
        #[source]
        source: Box<Error>,
    },

    /// Row decryption failed after the cipher stage succeeded
    #[error("row decryption failed: {source}")]
    RowDecryption {
        /// The inner failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns `true` for failures raised by the cipher gateway itself.
    #[must_use]
    pub const fn is_cryptographic(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyLength { .. }
                | Self::InvalidNonceLength { .. }
                | Self::KeyDerivation(_)
                | Self::RandomGeneration(_)
                | Self::EncryptionFailed(_)
                | Self::DecryptionFailed(_)
                | Self::AuthenticationFailed
        )
    }

    /// Wraps `self` with row-decryption context unless it is already terminal.
    pub(crate) fn into_row_decryption(self) -> Self {
        if self.is_cryptographic() || matches!(self, Self::RowDecryption { .. }) {
            self
        } else {
            Self::RowDecryption { source: Box::new(self) }
        }
    }

    /// Wraps `self` as the failure of row `index` inside a batch.
    pub(crate) fn at_row(self, index: usize) -> Self {
        Self::BatchRow { index, source: Box::new(self) }
    }
}

struct ValidationMessage<'a>(&'a [String], &'a [String]);

impl fmt::Display for ValidationMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metadata validation failed: {}", self.0.join("; "))?;
        if !self.1.is_empty() {
            write!(f, " (warnings: {})", self.1.join("; "))?;
        }
        Ok(())
    }
}

/// Errors raised while converting rows and tables to and from text.
#[derive(Debug)]
pub enum CodecError {
    /// A column's text could not be read as its declared type
    Conversion {
        /// Column name (or a placeholder for scalar values)
        column: String,
        /// Expected semantic type tag
        data_type: &'static str,
        /// The offending text
        value: String,
    },

    /// A value's kind does not match its column's semantic type
    TypeMismatch {
        /// Column name
        column: String,
        /// Column's semantic type tag
        expected: &'static str,
        /// Kind of the supplied value
        actual: &'static str,
    },

    /// A document names a column the schema does not have
    UnknownColumn(String),

    /// A required element or attribute is absent
    MissingElement(String),

    /// A schema attribute holds an unusable value
    InvalidSchema(String),

    /// The text is not well-formed XML
    Xml(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversion { column, data_type, value } => {
                write!(f, "column '{column}': cannot read {value:?} as {data_type}")
            }
            Self::TypeMismatch { column, expected, actual } => {
                write!(f, "column '{column}': expected {expected} value, got {actual}")
            }
            Self::UnknownColumn(name) => write!(f, "unknown column: {name}"),
            Self::MissingElement(name) => write!(f, "missing element: {name}"),
            Self::InvalidSchema(msg) => write!(f, "invalid schema: {msg}"),
            Self::Xml(msg) => write!(f, "malformed XML: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<quick_xml::Error> for CodecError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_reasons_and_warnings() {
        let err = Error::Validation {
            errors: vec!["iterations out of range".into(), "salt too short".into()],
            warnings: vec!["low iteration count".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("iterations out of range; salt too short"));
        assert!(msg.contains("warnings: low iteration count"));
    }

    #[test]
    fn test_cryptographic_errors_are_not_rewrapped() {
        let err = Error::AuthenticationFailed.into_row_decryption();
        assert!(matches!(err, Error::AuthenticationFailed));

        let err = Error::Codec(CodecError::UnknownColumn("x".into())).into_row_decryption();
        assert!(matches!(err, Error::RowDecryption { .. }));
        assert!(err.to_string().starts_with("row decryption failed: "));

        let err = err.into_row_decryption();
        let Error::RowDecryption { source } = err else { panic!("expected RowDecryption") };
        assert!(matches!(*source, Error::Codec(_)));
    }

    #[test]
    fn test_batch_row_reports_index() {
        let err = Error::InvalidArgument("bad".into()).at_row(3);
        assert!(matches!(err, Error::BatchRow { index: 3, .. }));
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_codec_error_names_column() {
        let err = CodecError::Conversion {
            column: "age".into(),
            data_type: "int32",
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "column 'age': cannot read \"abc\" as int32");
    }
}
