//! Layered secret resolution.
//!
//! Resolution order for `get(key)`, each step a possible short-circuit:
//!
//! 1. process environment (wins unconditionally)
//! 2. instance cache, valid only while the record file's (mtime, size)
//!    fingerprint matches what was cached
//! 3. parsed record lookup (`_`-prefixed keys are reserved and invisible)
//! 4. `vault:` reference → [`VaultStore`]; a miss there is a `VaultError`,
//!    never `SecretNotFound`, and the result is never cached
//! 5. plain value → cached and returned
//! 6. `enc:age:` value → decrypt with the lazily loaded identity; a
//!    decrypted vault reference follows rule 4
//!
//! Crypto and identity failures always propagate; a missing file is just an
//! empty record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::core::cipher;
use crate::core::constants::RESERVED_PREFIX;
use crate::core::identity::IdentityStore;
use crate::core::record::{classify, Record, ValueKind};
use crate::core::vault::{self, VaultStore};
use crate::error::{Error, FileError, Result};

/// (mtime, size) pair identifying one on-disk version of the record file.
/// `None` means the file does not exist.
type Fingerprint = Option<(SystemTime, u64)>;

#[derive(Debug, Default)]
struct Cache {
    fingerprint: Fingerprint,
    values: HashMap<String, (String, SystemTime)>,
}

/// Per-instance facade over environment, cache, record, identity, and vault.
#[derive(Debug)]
pub struct SecretResolver {
    path: PathBuf,
    identities: IdentityStore,
    vault: Arc<VaultStore>,
    cache: Mutex<Cache>,
}

impl SecretResolver {
    /// Resolver over `path`, wired to the process-wide vault.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_stores(path, IdentityStore::new(), VaultStore::shared())
    }

    /// Resolver with explicit stores (test isolation).
    pub fn with_stores(
        path: impl Into<PathBuf>,
        identities: IdentityStore,
        vault: Arc<VaultStore>,
    ) -> Self {
        Self {
            path: path.into(),
            identities,
            vault,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// The record file this resolver reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the resolver at a different record file, clearing the cache.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        *self.cache_guard() = Cache::default();
    }

    /// Resolve `key` through the layered lookup order.
    ///
    /// # Errors
    ///
    /// `SecretNotFound` when the key is absent from both environment and
    /// record (or reserved); `VaultError::MissingKey` when a vault reference
    /// dangles; crypto, identity, parse, and file errors propagate as-is.
    pub fn get(&self, key: &str) -> Result<String> {
        // 1. Environment wins unconditionally, even over a record entry.
        if let Ok(value) = std::env::var(key) {
            trace!(key, "resolved from environment");
            return Ok(value);
        }

        // 2. Cache, guarded by the file fingerprint.
        if let Some(value) = self.cached(key)? {
            trace!(key, "resolved from cache");
            return Ok(value);
        }

        // 3. Record lookup. Reserved keys are never visible.
        if key.starts_with(RESERVED_PREFIX) {
            return Err(Error::SecretNotFound(key.to_string()));
        }
        let record = Record::parse(&self.path)?;
        let raw = record
            .get(key)
            .ok_or_else(|| Error::SecretNotFound(key.to_string()))?;

        match classify(raw) {
            // 4. Vault indirection: never cached, miss is a VaultError.
            ValueKind::VaultRef(name) => {
                debug!(key, vault_key = name, "resolving through vault");
                vault::require(self.vault.get(name)?, name)
            }
            // 5. Plain value: cache and return.
            ValueKind::Plain(value) => {
                let value = value.to_string();
                self.cache_insert(key, &value);
                Ok(value)
            }
            // 6. Encrypted value: decrypt, then re-apply the vault rule.
            ValueKind::Encrypted(blob) => {
                let identity = self.identities.load()?;
                let plaintext = cipher::decrypt(blob, identity.as_age())?;
                if let ValueKind::VaultRef(name) = classify(&plaintext) {
                    debug!(key, vault_key = name, "decrypted value indirects into vault");
                    return vault::require(self.vault.get(name)?, name);
                }
                self.cache_insert(key, &plaintext);
                Ok(plaintext)
            }
        }
    }

    /// Whether `key` resolves, without forcing decryption.
    pub fn has(&self, key: &str) -> Result<bool> {
        if std::env::var(key).is_ok() {
            return Ok(true);
        }
        if key.starts_with(RESERVED_PREFIX) {
            return Ok(false);
        }
        Ok(Record::parse(&self.path)?.get(key).is_some())
    }

    /// Sorted union of environment names and non-reserved record keys.
    ///
    /// Environment entries that are not valid UTF-8 are skipped rather than
    /// enumerated, since `env::vars` would panic on them.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = std::env::vars_os()
            .filter_map(|(k, _)| k.into_string().ok())
            .collect();
        for key in Record::parse(&self.path)?.keys() {
            if !key.starts_with(RESERVED_PREFIX) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// Non-reserved keys of the record file alone, in file order.
    ///
    /// This is what gets injected into child processes: ambient environment
    /// variables are already visible to the child without our help.
    pub fn record_keys(&self) -> Result<Vec<String>> {
        Ok(Record::parse(&self.path)?
            .keys()
            .filter(|k| !k.starts_with(RESERVED_PREFIX))
            .map(str::to_string)
            .collect())
    }

    /// Drop every cached value.
    pub fn invalidate(&self) {
        *self.cache_guard() = Cache::default();
    }

    /// Look up the cache, clearing it first if the file changed.
    fn cached(&self, key: &str) -> Result<Option<String>> {
        let fingerprint = self.fingerprint()?;
        let mut cache = self.cache_guard();

        if cache.fingerprint != fingerprint {
            debug!(path = %self.path.display(), "record fingerprint changed, clearing cache");
            cache.values.clear();
            cache.fingerprint = fingerprint;
        }

        Ok(cache.values.get(key).map(|(value, _)| value.clone()))
    }

    fn cache_insert(&self, key: &str, value: &str) {
        let mut cache = self.cache_guard();
        cache
            .values
            .insert(key.to_string(), (value.to_string(), SystemTime::now()));
    }

    fn fingerprint(&self) -> Result<Fingerprint> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                let mtime = meta.modified().map_err(|e| FileError::io(&self.path, e))?;
                Ok(Some((mtime, meta.len())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FileError::io(&self.path, e).into()),
        }
    }

    fn cache_guard(&self) -> MutexGuard<'_, Cache> {
        match self.cache.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
