//! Caller-supplied encryption parameters and their policy checks.

use std::fmt;

use secrecy::{ExposeSecret, SecretString, SecretVec};

use crate::cipher::{self, KEY_SIZE, NONCE_SIZE};
use crate::error::Error;

/// Algorithm name for AES-256-GCM.
pub const AES_GCM: &str = "AES-GCM";

/// Algorithm name for AES-CBC. Recognised, but has no cipher implementation.
pub const AES_CBC: &str = "AES-CBC";

/// Lowest accepted PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Highest accepted PBKDF2 iteration count.
pub const MAX_ITERATIONS: u32 = 100_000;

/// Iteration counts below this are accepted with a warning.
pub const RECOMMENDED_ITERATIONS: u32 = 2_000;

/// Iteration count used when none is given.
pub const DEFAULT_ITERATIONS: u32 = 10_000;

/// Shortest accepted salt, in bytes.
pub const MIN_SALT_LEN: usize = 8;

/// Longest accepted salt, in bytes.
pub const MAX_SALT_LEN: usize = 64;

/// Salts shorter than this are accepted with a warning.
pub const RECOMMENDED_SALT_LEN: usize = 16;

/// Secret used to obtain the 32-byte cipher key.
pub enum KeyMaterial {
    /// Password stretched with PBKDF2 over the metadata's salt.
    Password(SecretString),
    /// Raw 32-byte key used as-is.
    RawKey(SecretVec<u8>),
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password([REDACTED])"),
            Self::RawKey(_) => f.write_str("RawKey([REDACTED])"),
        }
    }
}

/// Parameters for one encryption or decryption request.
///
/// # Example
///
/// ```
/// use rowseal::metadata::EncryptionMetadata;
///
/// let metadata = EncryptionMetadata::with_password("test123", vec![0u8; 16]).iterations(10_000);
/// let report = metadata.validate(false);
/// assert!(report.is_valid());
/// ```
#[derive(Debug)]
pub struct EncryptionMetadata {
    /// Algorithm name, e.g. [`AES_GCM`].
    pub algorithm: String,
    /// Password or raw key.
    pub key: Option<KeyMaterial>,
    /// PBKDF2 salt.
    pub salt: Option<Vec<u8>>,
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// Caller-chosen nonce. Ignored when `auto_generate_nonce` is set.
    pub nonce: Option<Vec<u8>>,
    /// Generate a fresh random nonce per encryption.
    pub auto_generate_nonce: bool,
}

impl Default for EncryptionMetadata {
    fn default() -> Self {
        Self {
            algorithm: AES_GCM.to_string(),
            key: None,
            salt: None,
            iterations: DEFAULT_ITERATIONS,
            nonce: None,
            auto_generate_nonce: true,
        }
    }
}

impl EncryptionMetadata {
    /// Password-based metadata with auto-generated nonces.
    #[must_use]
    pub fn with_password(password: impl Into<String>, salt: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Some(KeyMaterial::Password(SecretString::new(password.into()))),
            salt: Some(salt.into()),
            ..Self::default()
        }
    }

    /// Raw-key metadata with auto-generated nonces.
    #[must_use]
    pub fn with_raw_key(key: impl Into<Vec<u8>>) -> Self {
        Self { key: Some(KeyMaterial::RawKey(SecretVec::new(key.into()))), ..Self::default() }
    }

    /// Sets the PBKDF2 iteration count.
    #[must_use]
    pub const fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Uses a fixed nonce and turns auto-generation off.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<Vec<u8>>) -> Self {
        self.nonce = Some(nonce.into());
        self.auto_generate_nonce = false;
        self
    }

    /// Sets the algorithm name.
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Salt bytes, empty when none is set.
    #[must_use]
    pub fn salt_bytes(&self) -> &[u8] {
        self.salt.as_deref().unwrap_or_default()
    }

    /// Checks the metadata against policy.
    ///
    /// With `ignore_nonce` the nonce rules are skipped; decryption reads the
    /// nonce from the payload.
    #[must_use]
    pub fn validate(&self, ignore_nonce: bool) -> ValidationReport {
        let mut report = ValidationReport::default();

        let algorithm = self.algorithm.trim();
        if algorithm.is_empty() {
            report.error("algorithm is required");
        } else if algorithm.eq_ignore_ascii_case(AES_CBC) {
            report.error(format!("algorithm {AES_CBC} has no cipher implementation"));
        } else if !algorithm.eq_ignore_ascii_case(AES_GCM) {
            report.error(format!("unsupported algorithm: {algorithm}"));
        }

        match &self.key {
            None => report.error("a password or raw key is required"),
            Some(KeyMaterial::Password(password)) => {
                if password.expose_secret().is_empty() {
                    report.error("password must not be empty");
                }
                if self.salt.as_ref().map_or(true, Vec::is_empty) {
                    report.error("salt is required with a password");
                }
            }
            Some(KeyMaterial::RawKey(key)) => {
                let len = key.expose_secret().len();
                if len != KEY_SIZE {
                    report.error(format!("raw key must be {KEY_SIZE} bytes, got {len}"));
                }
            }
        }

        if let Some(salt) = self.salt.as_ref().filter(|s| !s.is_empty()) {
            if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
                report.error(format!(
                    "salt must be {MIN_SALT_LEN} to {MAX_SALT_LEN} bytes, got {}",
                    salt.len()
                ));
            } else if salt.len() < RECOMMENDED_SALT_LEN {
                report.warning(format!(
                    "salt of {} bytes is shorter than the recommended {RECOMMENDED_SALT_LEN}",
                    salt.len()
                ));
            }
        }

        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            report.error(format!(
                "iterations must be {MIN_ITERATIONS} to {MAX_ITERATIONS}, got {}",
                self.iterations
            ));
        } else if self.iterations < RECOMMENDED_ITERATIONS {
            report.warning(format!(
                "{} iterations is below the recommended {RECOMMENDED_ITERATIONS}",
                self.iterations
            ));
        }

        if !ignore_nonce {
            match &self.nonce {
                Some(nonce) if nonce.len() != NONCE_SIZE => report.error(format!(
                    "nonce must be {NONCE_SIZE} bytes, got {}",
                    nonce.len()
                )),
                None if !self.auto_generate_nonce => {
                    report.error("nonce is required when auto-generation is off");
                }
                _ => {}
            }
        }

        report
    }

    /// Produces the 32-byte cipher key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] without key material,
    /// [`Error::InvalidKeyLength`] for a wrongly sized raw key, and
    /// [`Error::KeyDerivation`] if PBKDF2 fails.
    pub fn derive_key(&self) -> Result<SecretVec<u8>, Error> {
        match &self.key {
            None => Err(Error::InvalidArgument("no key material".into())),
            Some(KeyMaterial::Password(password)) => cipher::derive_key(
                password.expose_secret().as_bytes(),
                self.salt_bytes(),
                self.iterations,
                KEY_SIZE,
            ),
            Some(KeyMaterial::RawKey(key)) => {
                let key = key.expose_secret();
                if key.len() != KEY_SIZE {
                    return Err(Error::InvalidKeyLength { expected: KEY_SIZE, actual: key.len() });
                }
                Ok(SecretVec::new(key.clone()))
            }
        }
    }
}

/// Outcome of [`EncryptionMetadata::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Reasons the metadata is unusable.
    pub errors: Vec<String>,
    /// Advisories that do not block the request.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns `true` when there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts to a result, keeping the warnings on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] carrying errors and warnings together.
    pub fn into_result(self) -> Result<Vec<String>, Error> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Validation { errors: self.errors, warnings: self.warnings })
        }
    }
}
