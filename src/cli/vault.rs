//! Global vault commands.

use crate::cli::output;
use crate::core::vault::{self, VaultStore};
use crate::error::Result;

/// Set a vault key.
pub fn set(key: &str, value: &str) -> Result<()> {
    VaultStore::shared().set(key, value)?;
    output::success(&format!("vault key {key} set"));
    Ok(())
}

/// Print a vault value.
pub fn get(key: &str) -> Result<()> {
    let store = VaultStore::shared();
    let value = vault::require(store.get(key)?, key)?;
    println!("{value}");
    Ok(())
}

/// Remove a vault key.
pub fn rm(key: &str) -> Result<()> {
    VaultStore::shared().delete(key)?;
    output::success(&format!("vault key {key} removed"));
    Ok(())
}

/// List vault keys.
pub fn list() -> Result<()> {
    let keys = VaultStore::shared().list()?;

    if keys.is_empty() {
        output::dimmed("vault is empty");
        return Ok(());
    }
    for key in &keys {
        output::list_item(key);
    }
    Ok(())
}
