//! Identity (private key) management.
//!
//! One default identity lives at `<root>/.warren/identity.key`, owner-only,
//! inside an owner-only directory. An environment override carries base64 of
//! the raw key text for ephemeral use (CI, one-off decryption) without ever
//! touching disk.

use std::fs;
use std::path::PathBuf;

use age::x25519;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::core::constants::{ENV_HOME, ENV_IDENTITY, IDENTITY_FILE, IDENTITY_KEY_PREFIX, WARREN_DIR};
use crate::error::{Error, FileError, Result};

/// A private decryption key and its public counterpart.
pub struct Identity {
    inner: x25519::Identity,
}

impl Identity {
    /// Generate a fresh identity from OS entropy.
    pub fn generate() -> Self {
        Self {
            inner: x25519::Identity::generate(),
        }
    }

    /// The public recipient key string (`age1...`). Pure and infallible.
    pub fn public_key(&self) -> String {
        self.inner.to_public().to_string()
    }

    /// The recipient for sealing to this identity.
    pub fn recipient(&self) -> x25519::Recipient {
        self.inner.to_public()
    }

    /// Inner age identity, for decryption.
    pub fn as_age(&self) -> &x25519::Identity {
        &self.inner
    }

    fn parse(text: &str) -> Option<Self> {
        text.trim()
            .parse::<x25519::Identity>()
            .ok()
            .map(|inner| Self { inner })
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret half.
        f.debug_struct("Identity")
            .field("public_key", &self.public_key())
            .finish()
    }
}

/// Loads, persists, and memoizes the user's identity.
///
/// `load` calls within one process coalesce into a single shared outcome;
/// the file is read at most once per store.
#[derive(Debug, Default)]
pub struct IdentityStore {
    root: OnceCell<PathBuf>,
    loaded: OnceCell<Identity>,
}

impl IdentityStore {
    /// Store rooted at `WARREN_HOME` or the user's home directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rooted at an explicit directory (test isolation).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(root.into());
        Self {
            root: cell,
            loaded: OnceCell::new(),
        }
    }

    /// The `.warren` directory under this store's root.
    pub fn warren_dir(&self) -> Result<PathBuf> {
        Ok(self.root()?.join(WARREN_DIR))
    }

    /// Path of the default identity file.
    pub fn identity_path(&self) -> Result<PathBuf> {
        Ok(self.warren_dir()?.join(IDENTITY_FILE))
    }

    /// Write `identity` as the default for this root.
    ///
    /// The parent directory is created owner-only (0o700) and the key file
    /// restricted to owner read/write (0o600) on unix. Regeneration replaces
    /// the file wholesale.
    pub fn persist(&self, identity: &Identity) -> Result<()> {
        use age::secrecy::ExposeSecret;

        let path = self.identity_path()?;
        let dir = path.parent().expect("identity path always has a parent");

        fs::create_dir_all(dir).map_err(|e| FileError::io(dir, e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| FileError::io(dir, e))?;
        }

        let secret = identity.inner.to_string();
        fs::write(&path, format!("{}\n", secret.expose_secret()))
            .map_err(|e| FileError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| FileError::io(&path, e))?;
        }

        debug!(path = %path.display(), "identity persisted");
        Ok(())
    }

    /// Load the identity, preferring a validated env override.
    ///
    /// # Errors
    ///
    /// `Error::IdentityNotFound` when neither the override nor the default
    /// file yields a usable key.
    pub fn load(&self) -> Result<&Identity> {
        self.loaded.get_or_try_init(|| self.read_identity())
    }

    /// Whether a default identity file exists for this root.
    pub fn exists(&self) -> bool {
        self.identity_path().map(|p| p.exists()).unwrap_or(false)
    }

    fn root(&self) -> Result<&PathBuf> {
        self.root.get_or_try_init(|| {
            if let Ok(home) = std::env::var(ENV_HOME) {
                return Ok(PathBuf::from(home));
            }
            dirs::home_dir().ok_or_else(|| Error::File(FileError::NoHome))
        })
    }

    fn read_identity(&self) -> Result<Identity> {
        if let Some(identity) = identity_from_env() {
            debug!("using identity from {}", ENV_IDENTITY);
            return Ok(identity);
        }

        let path = self.identity_path()?;
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::IdentityNotFound)
            }
            Err(e) => return Err(FileError::io(&path, e).into()),
        };

        debug!(path = %path.display(), "identity loaded");
        Identity::parse(&contents).ok_or(Error::IdentityNotFound)
    }
}

/// Decode and validate the `WARREN_IDENTITY` override.
///
/// The value must be strict standard-alphabet base64 (URL-safe characters
/// are rejected) of text carrying the `AGE-SECRET-KEY-1` structural prefix.
/// An unusable override logs a warning and falls through to the file.
fn identity_from_env() -> Option<Identity> {
    let encoded = std::env::var(ENV_IDENTITY).ok()?;

    if !encoded
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        warn!("{} is not standard-alphabet base64, ignoring", ENV_IDENTITY);
        return None;
    }

    let decoded = match BASE64.decode(encoded.as_bytes()) {
        Ok(d) => d,
        Err(e) => {
            warn!("{} failed base64 decoding ({}), ignoring", ENV_IDENTITY, e);
            return None;
        }
    };

    let text = match String::from_utf8(decoded) {
        Ok(t) => t,
        Err(_) => {
            warn!("{} does not decode to text, ignoring", ENV_IDENTITY);
            return None;
        }
    };

    if !text.trim().starts_with(IDENTITY_KEY_PREFIX) {
        warn!(
            "{} does not carry an {} key, ignoring",
            ENV_IDENTITY, IDENTITY_KEY_PREFIX
        );
        return None;
    }

    let identity = Identity::parse(&text);
    if identity.is_none() {
        warn!("{} carries a malformed key, ignoring", ENV_IDENTITY);
    }
    identity
}
