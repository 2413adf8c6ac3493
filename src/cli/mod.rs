//! Command-line interface.
//!
//! Thin dispatch layer: subcommands translate into record, resolver, and
//! vault calls; errors bubble up to `main` which reports them as a non-zero
//! exit with a message.

pub mod keygen;
pub mod output;
pub mod run;
pub mod secrets;
pub mod vault;

use clap::{Parser, Subcommand};

/// Warren - layered secrets resolution for developers.
#[derive(Parser)]
#[command(
    name = "warren",
    about = "Layered secrets resolution over dotenv-style files",
    version
)]
pub struct Cli {
    /// Record file to operate on
    #[arg(short, long, global = true, default_value = ".env")]
    pub file: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Generate and persist a fresh identity
    Keygen {
        /// Replace an existing identity
        #[arg(long)]
        force: bool,
    },

    /// Set a secret in the record file
    Set {
        /// Secret key (e.g. DATABASE_URL)
        key: String,
        /// Secret value
        value: String,
        /// Seal the value to your own identity before writing
        #[arg(short, long)]
        encrypt: bool,
    },

    /// Resolve a secret through env, record, and vault
    Get {
        /// Secret key
        key: String,
    },

    /// Remove a secret from the record file
    Rm {
        /// Secret key
        key: String,
    },

    /// List resolvable keys
    Keys {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command with record secrets injected as env vars
    Run {
        /// Command and arguments to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Operate on the global vault
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },
}

/// Vault subcommands.
#[derive(Subcommand)]
pub enum VaultAction {
    /// Set a vault key
    Set {
        /// Vault key
        key: String,
        /// Value
        value: String,
    },

    /// Get a vault key
    Get {
        /// Vault key
        key: String,
    },

    /// Remove a vault key
    Rm {
        /// Vault key
        key: String,
    },

    /// List vault keys
    List,
}

/// Execute a command.
pub fn execute(command: Command, file: &str) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Keygen { force } => keygen::execute(force),
        Set {
            key,
            value,
            encrypt,
        } => secrets::set(file, &key, &value, encrypt),
        Get { key } => secrets::get(file, &key),
        Rm { key } => secrets::rm(file, &key),
        Keys { json } => secrets::keys(file, json),
        Run { command } => run::execute(file, &command),
        Vault { action } => match action {
            VaultAction::Set { key, value } => vault::set(&key, &value),
            VaultAction::Get { key } => vault::get(&key),
            VaultAction::Rm { key } => vault::rm(&key),
            VaultAction::List => vault::list(),
        },
    }
}
