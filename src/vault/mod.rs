//! Vault module — encrypted connection-profile storage.
//!
//! This module provides:
//! - Connection records and response views (`record`)
//! - The JSON store document on disk (`format`)
//! - `CredentialStore` with save/get/list/delete/test (`store`)

pub mod format;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use record::{
    AdditionalParams, ConnectionRecord, ConnectionSummary, ConnectionType, ConnectionView,
    DeleteConfirmation, NewConnection, ParamValue, SavedSummary, TestReport, DECRYPTION_ERROR_SENTINEL,
    DEFAULT_CONNECTION,
};
pub use store::CredentialStore;
