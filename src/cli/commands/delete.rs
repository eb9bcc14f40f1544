//! `connvault delete` — remove a connection from the store.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, project: &str, connection: &str, force: bool) -> Result<()> {
    let store = open_store(cli)?;

    // Fail on a mistyped name before asking anything.
    store.get(project, connection, false)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete connection '{connection}' from project '{project}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let confirmation = store.delete(project, connection)?;

    output::success(&format!(
        "Deleted connection '{connection}' from project '{project}'"
    ));
    if confirmation.project_removed {
        output::info(&format!("Project '{project}' had no connections left and was removed."));
    }

    Ok(())
}
