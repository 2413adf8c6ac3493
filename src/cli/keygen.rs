//! Identity generation command.

use crate::cli::output;
use crate::core::identity::{Identity, IdentityStore};
use crate::error::{FileError, Result};

/// Generate a fresh identity and persist it as the default.
///
/// Refuses to overwrite an existing identity without `--force`: replacing
/// the key makes every blob sealed to the old one undecryptable.
pub fn execute(force: bool) -> Result<()> {
    let store = IdentityStore::new();

    if store.exists() && !force {
        output::hint("values sealed to the old key would become unreadable");
        return Err(FileError::io(
            store.identity_path()?,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "identity already exists (pass --force to replace it)",
            ),
        )
        .into());
    }

    let identity = Identity::generate();
    store.persist(&identity)?;

    output::success("identity generated");
    output::kv("path", store.identity_path()?.display());
    output::kv("public key", identity.public_key());

    Ok(())
}
