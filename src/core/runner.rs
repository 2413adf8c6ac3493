//! Child-process launcher with injected secrets.
//!
//! Every resolvable record key becomes an environment variable of the child;
//! the child's exit code is mirrored back to the caller. Secrets never touch
//! disk on the way through.

use std::process::Command;

use tracing::debug;

use crate::core::resolver::SecretResolver;
use crate::error::{FileError, Result};

/// Run `command` with all of the resolver's record keys in its environment.
///
/// # Errors
///
/// `FileError::Spawn` when the command cannot be started; any resolution
/// failure (decryption, dangling vault reference) aborts before spawning.
pub fn run_with_secrets(resolver: &SecretResolver, command: &[String]) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        return Err(FileError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no command specified"),
        }
        .into());
    };

    let mut pairs = Vec::new();
    for key in resolver.record_keys()? {
        let value = resolver.get(&key)?;
        pairs.push((key, value));
    }

    debug!(program, injected = pairs.len(), "spawning child with secrets");

    let status = Command::new(program)
        .args(args)
        .envs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .status()
        .map_err(|e| FileError::Spawn {
            command: program.clone(),
            source: e,
        })?;

    // A signal-terminated child has no code; report generic failure.
    Ok(status.code().unwrap_or(1))
}
