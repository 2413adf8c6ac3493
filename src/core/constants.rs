//! Shared constants: paths, env var names, value prefixes, lock tuning.

/// Directory under the root that holds the identity and vault files.
pub const WARREN_DIR: &str = ".warren";

/// Identity (private key) file name inside [`WARREN_DIR`].
pub const IDENTITY_FILE: &str = "identity.key";

/// Vault blob file name inside [`WARREN_DIR`].
pub const VAULT_FILE: &str = "vault.age";

/// Env var overriding the root directory (defaults to the user's home).
pub const ENV_HOME: &str = "WARREN_HOME";

/// Env var carrying a base64-encoded identity override.
pub const ENV_IDENTITY: &str = "WARREN_IDENTITY";

/// Env var controlling the tracing filter.
pub const ENV_LOG: &str = "WARREN_LOG";

/// Value prefix marking an age-sealed ciphertext.
pub const ENC_PREFIX: &str = "enc:age:";

/// Value prefix marking an indirection into the vault.
pub const VAULT_PREFIX: &str = "vault:";

/// Record keys starting with this are reserved and never resolved.
pub const RESERVED_PREFIX: char = '_';

/// Structural prefix required of a decoded identity override.
pub const IDENTITY_KEY_PREFIX: &str = "AGE-SECRET-KEY-1";

/// Default number of lock acquisition attempts before giving up.
pub const LOCK_ATTEMPTS: u32 = 20;

/// Base backoff between lock attempts, in milliseconds. Each retry adds a
/// random jitter of up to the same amount on top.
pub const LOCK_BACKOFF_MS: u64 = 25;

/// Ceiling on a single backoff sleep, in milliseconds.
pub const LOCK_BACKOFF_CAP_MS: u64 = 250;
