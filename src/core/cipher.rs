//! Age encryption and decryption for single-line secret values.
//!
//! Ciphertexts travel inside line-oriented files, so the raw age output is
//! wrapped in standard base64 to make a one-line opaque blob. Wrong key,
//! corruption, and truncation are indistinguishable to the caller; all
//! surface as [`Error::Decryption`].

use std::io::{Read, Write};

use age::x25519;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::trace;

use crate::error::{Error, Result};

/// Encrypt `plaintext` to the given recipients, returning a base64 blob.
///
/// # Errors
///
/// Returns `Error::Encryption` when the recipient set is empty or the age
/// stream fails.
pub fn encrypt(plaintext: &str, recipients: &[x25519::Recipient]) -> Result<String> {
    trace!(
        recipients = recipients.len(),
        plaintext_len = plaintext.len(),
        "encrypting"
    );

    let encryptor =
        age::Encryptor::with_recipients(recipients.iter().map(|r| r as &dyn age::Recipient))
            .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut encrypted = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut encrypted)
        .map_err(|e| Error::Encryption(e.to_string()))?;
    writer
        .write_all(plaintext.as_bytes())
        .map_err(|e| Error::Encryption(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| Error::Encryption(e.to_string()))?;

    trace!(ciphertext_len = encrypted.len(), "encrypted");

    Ok(BASE64.encode(encrypted))
}

/// Decrypt a base64 blob produced by [`encrypt`].
pub fn decrypt(blob: &str, identity: &x25519::Identity) -> Result<String> {
    let encrypted = BASE64
        .decode(blob.trim())
        .map_err(|e| Error::Decryption(format!("invalid base64: {e}")))?;

    trace!(ciphertext_len = encrypted.len(), "decrypting");

    let decryptor = age::Decryptor::new(encrypted.as_slice())
        .map_err(|e| Error::Decryption(e.to_string()))?;

    let mut decrypted = Vec::new();
    let mut reader = decryptor
        .decrypt(std::iter::once(identity as &dyn age::Identity))
        .map_err(|e| Error::Decryption(e.to_string()))?;
    reader
        .read_to_end(&mut decrypted)
        .map_err(|e| Error::Decryption(e.to_string()))?;

    String::from_utf8(decrypted).map_err(|e| Error::Decryption(format!("UTF-8 error: {e}")))
}
