//! `connvault list` — display saved connections in a table.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, project: Option<&str>) -> Result<()> {
    let store = open_store(cli)?;
    let rows = store.list(project)?;

    match project {
        Some(name) => output::info(&format!("{name} — {} connection(s)", rows.len())),
        None => output::info(&format!("{} connection(s)", rows.len())),
    }

    output::print_connections_table(&rows);

    Ok(())
}
