use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in connvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong encryption key or corrupted data")]
    DecryptionFailed,

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Store errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(Missing),

    // --- Persistence errors ---
    #[error("Cannot access store at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid store format in {}: {reason}", path.display())]
    InvalidStoreFormat { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// The key that a lookup failed on.
///
/// Unknown projects and unknown connections inside a known project are
/// the same kind of failure, but callers need to tell which key was wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("Project '{0}' not found")]
    Project(String),

    #[error("Connection '{connection}' not found for project '{project}'")]
    Connection { project: String, connection: String },
}

impl VaultError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns `true` for either flavour of not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience type alias for connvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
