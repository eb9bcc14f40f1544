//! `connvault keygen` — print a fresh encryption key.

use crate::crypto::EncryptionKey;
use crate::errors::Result;

/// Execute the `keygen` command.
///
/// Only the key goes to stdout so it can be captured directly:
/// `export DB_ENCRYPTION_KEY=$(connvault keygen)`.
pub fn execute() -> Result<()> {
    let key = EncryptionKey::generate();
    println!("{}", key.to_hex().as_str());
    Ok(())
}
