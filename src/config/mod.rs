//! Startup configuration: the `.connvault.toml` file and the resolved
//! key + store path handed to the store.

pub mod settings;

pub use settings::{KeySource, Settings, VaultConfig, KEY_ENV_VAR};
