//! `connvault serve` — run the MCP server on stdio.

use tracing::info;

use crate::cli::{vault_config, Cli};
use crate::config::KeySource;
use crate::errors::Result;
use crate::mcp::McpServer;
use crate::vault::CredentialStore;

/// Execute the `serve` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = vault_config(cli)?;

    info!(
        store = %config.store_path.display(),
        persistent_key = config.key_source == KeySource::External,
        "starting connvault MCP server"
    );

    let server = McpServer::new(CredentialStore::from_config(&config));
    server.run_stdio()
}
