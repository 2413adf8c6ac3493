//! Error taxonomy for warren operations.
//!
//! Failures are grouped by what the caller can do about them: identity and
//! crypto problems propagate untouched, file-level problems carry the path
//! they happened on, and vault problems are kept distinct from plain
//! "secret not found" so a dangling indirection is never mistaken for an
//! absent key.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all warren operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no usable identity: set WARREN_IDENTITY or run `warren keygen`")]
    IdentityNotFound,

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("parse error at line {line}: {reason} ({raw:?})")]
    Parse {
        line: usize,
        raw: String,
        reason: String,
    },

    #[error("invalid key {key:?}: {reason}")]
    Validation { key: String, reason: String },

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Filesystem-level failures.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out waiting for lock on {0}")]
    LockTimeout(PathBuf),

    #[error("unable to determine home directory")]
    NoHome,

    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Attach a path to an io error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Vault-specific failures, distinct from [`Error::SecretNotFound`].
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("vault ciphertext is corrupt: {0}")]
    Corrupt(String),

    #[error("vault key not found: {0}")]
    MissingKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
