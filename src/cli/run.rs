//! Run a command with injected secrets.

use crate::core::resolver::SecretResolver;
use crate::core::runner;
use crate::error::Result;

/// Resolve every record key and run `command` with them in its environment,
/// mirroring the child's exit code.
pub fn execute(file: &str, command: &[String]) -> Result<()> {
    let resolver = SecretResolver::new(file);
    let code = runner::run_with_secrets(&resolver, command)?;

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
