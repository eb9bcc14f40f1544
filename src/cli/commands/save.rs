//! `connvault save` — add or overwrite a connection.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{open_store, parse_param, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::{AdditionalParams, ConnectionType, NewConnection};

/// Flags of the `save` command, grouped to keep the signature short.
pub struct SaveOptions<'a> {
    pub project: &'a str,
    pub connection: &'a str,
    pub host: &'a str,
    pub port: u32,
    pub database: &'a str,
    pub username: &'a str,
    pub password: Option<&'a str>,
    pub connection_type: &'a str,
    pub no_ssl: bool,
    pub read_write: bool,
    pub params: &'a [String],
}

/// Execute the `save` command.
pub fn execute(cli: &Cli, opts: SaveOptions<'_>) -> Result<()> {
    // Validate cheap inputs before asking for a password.
    let connection_type: ConnectionType = opts.connection_type.parse()?;
    let additional_params = opts
        .params
        .iter()
        .map(|raw| parse_param(raw))
        .collect::<Result<AdditionalParams>>()?;

    // Determine the password from one of three sources.
    let password = if let Some(p) = opts.password {
        // Source 1: Inline value on the command line.
        output::warning("Password provided on command line — it may appear in shell history.");
        Zeroizing::new(p.to_string())
    } else if !io::stdin().is_terminal() {
        // Source 2: Piped input (stdin is not a terminal).
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        Zeroizing::new(buf.trim_end().to_string())
    } else {
        // Source 3: Interactive secure prompt (default).
        let pw = dialoguer::Password::new()
            .with_prompt(format!(
                "Password for {}/{}",
                opts.project, opts.connection
            ))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
        Zeroizing::new(pw)
    };

    let input = NewConnection {
        host: opts.host.to_string(),
        port: opts.port,
        database_name: opts.database.to_string(),
        username: opts.username.to_string(),
        password,
        connection_type,
        ssl_enabled: !opts.no_ssl,
        is_readonly: !opts.read_write,
        additional_params,
    };

    let store = open_store(cli)?;
    let saved = store.save(opts.project, opts.connection, input)?;

    output::success(&format!(
        "Saved {}/{} ({} at {}:{}, database {}, {})",
        saved.project_name,
        saved.connection_name,
        saved.connection_type,
        saved.host,
        saved.port,
        saved.database_name,
        if saved.is_readonly { "read-only" } else { "read-write" }
    ));
    output::tip("Serve it to MCP clients: connvault serve");

    Ok(())
}
