//! Core library components.

pub mod atomic;
pub mod cipher;
pub mod constants;
pub mod identity;
pub mod lockfile;
pub mod record;
pub mod resolver;
pub mod runner;
pub mod schema;
pub mod vault;

pub use self::identity::{Identity, IdentityStore};
pub use self::record::Record;
pub use self::resolver::SecretResolver;
pub use self::vault::VaultStore;
