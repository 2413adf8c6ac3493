//! The global vault: an encrypted key-value store under the user's home.
//!
//! The whole mapping is persisted as exactly one sealed blob at
//! `<root>/.warren/vault.age`, replaced wholesale on every mutation. Reads
//! go through a memoized decrypted snapshot; every mutation drops the memo
//! and reloads under the path lock first, so concurrent writers in other
//! processes are never clobbered.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::core::atomic::write_atomic;
use crate::core::cipher;
use crate::core::constants::VAULT_FILE;
use crate::core::identity::IdentityStore;
use crate::core::lockfile::with_lock;
use crate::error::{Error, FileError, Result, VaultError};

type Snapshot = BTreeMap<String, String>;

/// Encrypted key-value store sealed to the caller's own recipient key.
///
/// Not a sharing mechanism: the blob is sealed to a single recipient.
#[derive(Debug)]
pub struct VaultStore {
    identities: IdentityStore,
    snapshot: Mutex<Option<Snapshot>>,
}

impl VaultStore {
    /// Vault rooted at `WARREN_HOME` or the user's home directory.
    pub fn new() -> Self {
        Self {
            identities: IdentityStore::new(),
            snapshot: Mutex::new(None),
        }
    }

    /// Vault rooted at an explicit directory (test isolation).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            identities: IdentityStore::with_root(root),
            snapshot: Mutex::new(None),
        }
    }

    /// The process-wide vault handle.
    ///
    /// All resolvers in a process share this instance, so a mutation from
    /// any of them invalidates the one snapshot everyone reads.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceCell<Arc<VaultStore>> = OnceCell::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    /// Path of the sealed vault file.
    pub fn vault_path(&self) -> Result<PathBuf> {
        Ok(self.identities.warren_dir()?.join(VAULT_FILE))
    }

    /// Look up a vault key in the memoized snapshot.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut guard = self.guard();
        let snapshot = self.ensure_loaded(&mut guard)?;
        Ok(snapshot.get(key).cloned())
    }

    /// All vault keys, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut guard = self.guard();
        let snapshot = self.ensure_loaded(&mut guard)?;
        Ok(snapshot.keys().cloned().collect())
    }

    /// Set a vault key, replacing the sealed blob wholesale.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when the key contains `=` or either side carries
    /// a line break. The sealed plaintext is line-oriented, so such an entry
    /// would make every later load fail as corrupt.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_entry(key, value)?;
        let path = self.vault_path()?;
        self.ensure_vault_dir(&path)?;
        with_lock(&path, || {
            let mut guard = self.guard();
            // Reload under the lock: another process may have written since
            // the snapshot was taken.
            *guard = None;
            let mut map = self.load_fresh()?;
            map.insert(key.to_string(), value.to_string());
            self.persist(&map)?;
            debug!(key, "vault key set");
            *guard = Some(map);
            Ok(())
        })
    }

    /// Delete a vault key.
    ///
    /// # Errors
    ///
    /// `VaultError::MissingKey` when the key is not present.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.vault_path()?;
        self.ensure_vault_dir(&path)?;
        with_lock(&path, || {
            let mut guard = self.guard();
            *guard = None;
            let mut map = self.load_fresh()?;
            if map.remove(key).is_none() {
                return Err(VaultError::MissingKey(key.to_string()).into());
            }
            self.persist(&map)?;
            debug!(key, "vault key deleted");
            *guard = Some(map);
            Ok(())
        })
    }

    /// Drop the memoized snapshot; the next read reloads from disk.
    pub fn invalidate(&self) {
        *self.guard() = None;
    }

    /// Create the directory holding the vault file.
    ///
    /// The lock marker is a sibling of the vault file, so the directory must
    /// exist before the lock can be taken at all.
    fn ensure_vault_dir(&self, path: &Path) -> Result<()> {
        let dir = path.parent().expect("vault path always has a parent");
        fs::create_dir_all(dir).map_err(|e| FileError::io(dir, e))?;
        Ok(())
    }

    fn guard(&self) -> MutexGuard<'_, Option<Snapshot>> {
        match self.snapshot.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn ensure_loaded<'a>(
        &self,
        guard: &'a mut MutexGuard<'_, Option<Snapshot>>,
    ) -> Result<&'a Snapshot> {
        if guard.is_none() {
            **guard = Some(self.load_fresh()?);
        }
        Ok(guard.as_ref().expect("snapshot just installed"))
    }

    /// Read and decrypt the vault file.
    ///
    /// A missing file is an empty snapshot and needs no identity; a present
    /// file without a usable identity is `IdentityNotFound`.
    fn load_fresh(&self) -> Result<Snapshot> {
        let path = self.vault_path()?;

        let blob = match fs::read_to_string(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "vault file missing, starting empty");
                return Ok(Snapshot::new());
            }
            Err(e) => return Err(FileError::io(&path, e).into()),
        };

        let identity = self.identities.load()?;
        let plaintext = cipher::decrypt(&blob, identity.as_age())
            .map_err(|e| VaultError::Corrupt(e.to_string()))?;

        let mut map = Snapshot::new();
        for line in plaintext.lines() {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(VaultError::Corrupt(format!("malformed vault line {line:?}")).into());
            };
            map.insert(key.to_string(), value.to_string());
        }

        debug!(entries = map.len(), "vault snapshot loaded");
        Ok(map)
    }

    /// Seal the full map to the caller's own recipient and replace the file.
    fn persist(&self, map: &Snapshot) -> Result<()> {
        let identity = self.identities.load()?;

        let mut plaintext = String::new();
        for (key, value) in map {
            plaintext.push_str(key);
            plaintext.push('=');
            plaintext.push_str(value);
            plaintext.push('\n');
        }

        let blob = cipher::encrypt(&plaintext, &[identity.recipient()])?;

        write_atomic(&self.vault_path()?, &blob)
    }
}

impl Default for VaultStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_entry(key: &str, value: &str) -> Result<()> {
    if key.contains('=') || key.contains('\n') || key.contains('\r') {
        return Err(Error::Validation {
            key: key.to_string(),
            reason: "vault key must not contain '=' or line breaks".to_string(),
        });
    }
    if value.contains('\n') || value.contains('\r') {
        return Err(Error::Validation {
            key: key.to_string(),
            reason: "value must not contain line breaks".to_string(),
        });
    }
    Ok(())
}

/// Map a vault miss to [`VaultError::MissingKey`].
///
/// Used where an indirection target is required to exist, which is distinct
/// from a record-level [`Error::SecretNotFound`].
pub fn require(value: Option<String>, key: &str) -> Result<String> {
    value.ok_or_else(|| Error::Vault(VaultError::MissingKey(key.to_string())))
}
