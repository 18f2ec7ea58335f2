//! AES-256-GCM and PBKDF2-HMAC-SHA256 primitives.
//!
//! Every call in this module takes one process-wide lock, so at most one
//! cryptographic operation runs at a time. Key and nonce slices are borrowed
//! for the duration of the call only; callers own (and zero) their copies.

use aes_gcm::aead::{rand_core::RngCore, Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::Hmac;
use parking_lot::{const_mutex, Mutex};
use secrecy::SecretVec;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::Error;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

static GATEWAY: Mutex<()> = const_mutex(());

/// Returns `n` bytes from the operating system's secure random source.
///
/// # Errors
///
/// Returns [`Error::RandomGeneration`] if the random source fails.
pub fn generate_random(n: usize) -> Result<Vec<u8>, Error> {
    let mut out = vec![0u8; n];
    let _guard = GATEWAY.lock();
    OsRng.try_fill_bytes(&mut out).map_err(|e| Error::RandomGeneration(e.to_string()))?;
    Ok(out)
}

/// Derives `output_len` bytes from `password` and `salt` with PBKDF2-HMAC-SHA256.
///
/// # Errors
///
/// Returns [`Error::KeyDerivation`] if `iterations` or `output_len` is zero,
/// or if `password` or `salt` is empty.
///
/// # Example
///
/// ```
/// use rowseal::cipher::derive_key;
/// use secrecy::ExposeSecret;
///
/// let key = derive_key(b"password", b"salt", 1, 32).unwrap();
/// assert_eq!(key.expose_secret().len(), 32);
/// ```
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Result<SecretVec<u8>, Error> {
    if iterations == 0 {
        return Err(Error::KeyDerivation("iteration count must be positive".into()));
    }
    if output_len == 0 {
        return Err(Error::KeyDerivation("output length must be positive".into()));
    }
    if password.is_empty() {
        return Err(Error::KeyDerivation("password must not be empty".into()));
    }
    if salt.is_empty() {
        return Err(Error::KeyDerivation("salt must not be empty".into()));
    }

    let mut out = Zeroizing::new(vec![0u8; output_len]);
    {
        let _guard = GATEWAY.lock();
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut out)
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;
    }
    Ok(SecretVec::new(std::mem::take(&mut *out)))
}

/// Encrypts `plaintext` with AES-256-GCM, no associated data.
///
/// Returns the ciphertext with the 16-byte tag appended.
///
/// # Errors
///
/// Returns [`Error::InvalidKeyLength`] or [`Error::InvalidNonceLength`] for
/// wrongly sized inputs, and [`Error::EncryptionFailed`] if the cipher fails.
pub fn encrypt(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, Error> {
    check_lengths(key, nonce)?;

    let _guard = GATEWAY.lock();
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::EncryptionFailed(format!("invalid key: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("AES-256-GCM encryption failed: {e}")))
}

/// Decrypts `ciphertext` (with appended tag) produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`Error::DecryptionFailed`] for input shorter than the tag and
/// [`Error::AuthenticationFailed`] if the tag does not verify.
pub fn decrypt(ciphertext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, Error> {
    check_lengths(key, nonce)?;
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::DecryptionFailed(format!(
            "ciphertext is {} bytes, shorter than the {TAG_SIZE}-byte tag",
            ciphertext.len()
        )));
    }

    let _guard = GATEWAY.lock();
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::DecryptionFailed(format!("invalid key: {e}")))?;
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| Error::AuthenticationFailed)
}

fn check_lengths(key: &[u8], nonce: &[u8]) -> Result<(), Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidKeyLength { expected: KEY_SIZE, actual: key.len() });
    }
    if nonce.len() != NONCE_SIZE {
        return Err(Error::InvalidNonceLength { expected: NONCE_SIZE, actual: nonce.len() });
    }
    Ok(())
}
