//! `connvault get` — show one connection.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, project: &str, connection: &str, show_password: bool) -> Result<()> {
    let store = open_store(cli)?;
    let view = store.get(project, connection, show_password)?;

    output::print_connection(&view);

    if view.password_unreadable() {
        output::warning(
            "The stored password could not be decrypted with the current key. \
             Was it saved with a different DB_ENCRYPTION_KEY?",
        );
    }

    Ok(())
}
