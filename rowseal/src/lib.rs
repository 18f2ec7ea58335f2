//! # `RowSeal`
//!
//! Row-level encryption for tabular data: typed rows are serialised to a
//! self-describing text form, sealed with AES-256-GCM under a PBKDF2-derived
//! key, and persisted as documents that keep the schema in clear.
//!
//! ## Features
//!
//! - Single-row, multi-row batch and single-value encryption
//! - Typed tabular codec preserving nulls, empty strings and fixed-width padding
//! - Embedded-schema (XSD-annotated) row documents, with or without wrappers
//! - Password (PBKDF2-HMAC-SHA256) or raw 256-bit keys
//! - Zeroization of derived keys and generated nonces on every exit path
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rowseal::prelude::*;
//!
//! # fn main() -> Result<(), Error> {
//! let schema = Arc::new(TableSchema::new([
//!     ColumnSchema::new("id_no", DataType::Text).with_max_length(13),
//!     ColumnSchema::new("name", DataType::Text).with_max_length(50),
//!     ColumnSchema::new("age", DataType::Int32),
//! ])?);
//! let row = Row::new(schema, vec!["1234567890123".into(), "Test User".into(), 30.into()])?;
//!
//! let vault = Vault::default();
//! let metadata = EncryptionMetadata::with_password("test123", vec![0u8; 16]);
//!
//! let (payload, _nonce) = vault.encrypt_row(&row, &metadata)?;
//! let document = wire::write_row(&payload);
//!
//! let restored = vault.decrypt_row(&wire::read_row(&document)?, &metadata)?;
//! assert_eq!(restored, row);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cipher;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod payload;
pub mod schema;
pub mod types;
pub mod vault;
pub mod wire;
pub mod xml;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::codec::EmbeddedLayout;
    pub use crate::config::VaultConfig;
    pub use crate::error::{CodecError, Error};
    pub use crate::logging::{EngineLogger, NoopLogger, TracingLogger};
    pub use crate::metadata::{EncryptionMetadata, KeyMaterial, ValidationReport};
    pub use crate::payload::{EncryptedBatch, EncryptedRow, EncryptedValue, PayloadMetadata};
    pub use crate::schema::{ColumnSchema, Row, Table, TableSchema};
    pub use crate::types::{DataType, SqlType, Value};
    pub use crate::vault::Vault;
    pub use crate::wire::{self, PayloadFormat};
}
