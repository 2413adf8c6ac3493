//! Record secret commands: set, get, rm, keys.

use std::path::Path;

use serde::Serialize;

use crate::cli::output;
use crate::core::cipher;
use crate::core::constants::ENC_PREFIX;
use crate::core::identity::IdentityStore;
use crate::core::record;
use crate::core::resolver::SecretResolver;
use crate::error::Result;

/// Set a secret, optionally sealing it to the caller's own identity first.
pub fn set(file: &str, key: &str, value: &str, encrypt: bool) -> Result<()> {
    let path = Path::new(file);

    if encrypt {
        let identities = IdentityStore::new();
        let identity = identities.load()?;
        let blob = cipher::encrypt(value, &[identity.recipient()])?;
        record::set(path, key, &format!("{ENC_PREFIX}{blob}"))?;
        output::success(&format!("{key} set (encrypted)"));
    } else {
        record::set(path, key, value)?;
        output::success(&format!("{key} set"));
    }

    Ok(())
}

/// Resolve and print a secret value.
pub fn get(file: &str, key: &str) -> Result<()> {
    let resolver = SecretResolver::new(file);
    let value = resolver.get(key)?;
    println!("{value}");
    Ok(())
}

/// Remove a secret from the record file.
pub fn rm(file: &str, key: &str) -> Result<()> {
    record::remove(Path::new(file), key)?;
    output::success(&format!("{key} removed"));
    Ok(())
}

#[derive(Serialize)]
struct KeyList<'a> {
    keys: &'a [String],
}

/// List the record's resolvable keys.
///
/// Only record keys are listed; the ambient environment is the caller's own
/// and would drown the output.
pub fn keys(file: &str, json: bool) -> Result<()> {
    let resolver = SecretResolver::new(file);
    let keys = resolver.record_keys()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&KeyList { keys: &keys })
            .expect("key list serialization cannot fail"));
        return Ok(());
    }

    if keys.is_empty() {
        output::dimmed("no secrets stored");
        return Ok(());
    }
    for key in &keys {
        output::list_item(key);
    }
    Ok(())
}
