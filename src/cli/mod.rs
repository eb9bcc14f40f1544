//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::Path;

use clap::Parser;

use crate::config::{Settings, VaultConfig, KEY_ENV_VAR};
use crate::errors::{Result, VaultError};
use crate::vault::{CredentialStore, ParamValue, DEFAULT_CONNECTION};

/// connvault CLI: encrypted database connection vault.
#[derive(Parser)]
#[command(
    name = "connvault",
    about = "Encrypted database connection vault (MCP server and CLI)",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store file (default: connections.json, or `store_file` in .connvault.toml)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Encryption key, at least 64 hex characters
    #[arg(long, env = KEY_ENV_VAR, hide_env_values = true, global = true)]
    pub encryption_key: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout
    Serve,

    /// Save a connection (add or overwrite)
    Save {
        /// Project name (e.g. SHOP)
        project: String,
        /// Connection name
        #[arg(short, long, default_value = DEFAULT_CONNECTION)]
        connection: String,
        /// Database host address
        #[arg(long)]
        host: String,
        /// Database port number
        #[arg(long)]
        port: u32,
        /// Database name
        #[arg(long)]
        database: String,
        /// Database username
        #[arg(long)]
        username: String,
        /// Database password (omit for piped input or interactive prompt)
        #[arg(long)]
        password: Option<String>,
        /// Database type: mysql, postgresql, sqlite or mongodb
        #[arg(long = "type")]
        connection_type: String,
        /// Mark the connection as not using SSL
        #[arg(long)]
        no_ssl: bool,
        /// Mark the connection as read-write
        #[arg(long)]
        read_write: bool,
        /// Extra driver parameter, repeatable
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Show a connection
    Get {
        /// Project name
        project: String,
        /// Connection name
        #[arg(short, long, default_value = DEFAULT_CONNECTION)]
        connection: String,
        /// Decrypt and show the password
        #[arg(long)]
        show_password: bool,
    },

    /// List connections, optionally for one project
    List {
        /// Only show this project
        project: Option<String>,
    },

    /// Delete a connection
    Delete {
        /// Project name
        project: String,
        /// Connection name
        #[arg(short, long, default_value = DEFAULT_CONNECTION)]
        connection: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a stored connection (no live connection is made)
    Test {
        /// Project name
        project: String,
        /// Connection name
        #[arg(short, long, default_value = DEFAULT_CONNECTION)]
        connection: String,
    },

    /// Print a new random encryption key
    Keygen,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve settings, key and store path from the working directory and
/// CLI arguments.
pub fn vault_config(cli: &Cli) -> Result<VaultConfig> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    VaultConfig::resolve(
        &settings,
        &cwd,
        cli.store.as_deref().map(Path::new),
        cli.encryption_key.as_deref(),
    )
}

/// Open the credential store described by the CLI arguments.
pub fn open_store(cli: &Cli) -> Result<CredentialStore> {
    let config = vault_config(cli)?;
    Ok(CredentialStore::from_config(&config))
}

/// Parse a `KEY=VALUE` parameter; the value type is inferred.
pub fn parse_param(raw: &str) -> Result<(String, ParamValue)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        VaultError::validation(format!("parameter '{raw}' must look like KEY=VALUE"))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(VaultError::validation(format!(
            "parameter '{raw}' has an empty name"
        )));
    }

    Ok((key.to_string(), ParamValue::infer(value)))
}
