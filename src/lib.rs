//! Warren - layered secrets resolution for developers.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── keygen        # Identity generation
//! │   ├── secrets       # Record get/set/rm/keys
//! │   ├── vault         # Global vault operations
//! │   └── run           # Run a command with injected secrets
//! └── core/             # Core library components
//!     ├── record        # Line-oriented secret file codec
//!     ├── identity      # Private key management
//!     ├── cipher        # age encrypt/decrypt
//!     ├── lockfile      # Cross-process marker locks
//!     ├── atomic        # Rename-based atomic replace
//!     ├── vault         # Encrypted global key-value store
//!     ├── resolver      # Layered env/cache/record/vault resolution
//!     ├── runner        # Child-process secret injection
//!     └── schema        # Injected-validator adapter
//! ```
//!
//! # Features
//!
//! - Human-editable `KEY=VALUE` records with comments preserved on rewrite
//! - Per-value age encryption (`enc:age:`) and vault indirection (`vault:`)
//! - Strict resolution order: environment, cache, record, vault
//! - Crash-safe mutations: per-path marker locks plus atomic replace

pub mod cli;
pub mod core;
pub mod error;

pub use crate::core::{Identity, IdentityStore, Record, SecretResolver, VaultStore};
pub use crate::error::{Error, FileError, Result, VaultError};
