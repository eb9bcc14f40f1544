//! Connection records and the views handed back to callers.
//!
//! A `ConnectionRecord` is what lives on disk: every field of a
//! connection profile, with the password only ever present as a
//! `Ciphertext`.  The view types (`ConnectionView`, `ConnectionSummary`,
//! ...) are what operations return; none of them carries ciphertext.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::Ciphertext;
use crate::errors::{Result, VaultError};

/// Connection name used when the caller does not give one.
pub const DEFAULT_CONNECTION: &str = "main";

/// Placed in the password field of a `ConnectionView` when the stored
/// ciphertext cannot be decrypted with the current key.
pub const DECRYPTION_ERROR_SENTINEL: &str = "[DECRYPTION_ERROR]";

// ---------------------------------------------------------------------------
// ConnectionType
// ---------------------------------------------------------------------------

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Mysql,
    Postgresql,
    Sqlite,
    Mongodb,
}

impl ConnectionType {
    /// Every accepted value, in the order shown to users.
    pub const ALL: [ConnectionType; 4] = [
        ConnectionType::Mysql,
        ConnectionType::Postgresql,
        ConnectionType::Sqlite,
        ConnectionType::Mongodb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Mysql => "mysql",
            ConnectionType::Postgresql => "postgresql",
            ConnectionType::Sqlite => "sqlite",
            ConnectionType::Mongodb => "mongodb",
        }
    }

    /// Whether this engine is reached over the network (needs a host).
    pub fn is_networked(&self) -> bool {
        !matches!(self, ConnectionType::Sqlite)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let accepted: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                VaultError::validation(format!(
                    "unsupported connection_type '{s}' (expected one of: {})",
                    accepted.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

/// A value in `additional_params`.
///
/// New values must be strings, numbers or booleans; `from_json` rejects
/// anything else.  Documents written by older tools may already hold
/// nested objects, arrays or null, which are read into `Other` and kept
/// as they are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ParamValue {
    /// Convert an arbitrary JSON value, rejecting anything non-scalar.
    pub fn from_json(name: &str, value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::String(s) => Ok(ParamValue::Text(s.clone())),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ParamValue::Integer(i)),
                None => n.as_f64().map(ParamValue::Float).ok_or_else(|| {
                    VaultError::validation(format!("additional_params.{name}: number out of range"))
                }),
            },
            Value::Null => Err(VaultError::validation(format!(
                "additional_params.{name}: null is not allowed"
            ))),
            Value::Array(_) | Value::Object(_) => Err(VaultError::validation(format!(
                "additional_params.{name}: only strings, numbers and booleans are allowed"
            ))),
        }
    }

    /// Infer a value from free text (`true`/`false`, integer, float,
    /// otherwise string).
    pub fn infer(text: &str) -> Self {
        if let Ok(b) = text.parse::<bool>() {
            return ParamValue::Bool(b);
        }
        if let Ok(i) = text.parse::<i64>() {
            return ParamValue::Integer(i);
        }
        match text.parse::<f64>() {
            Ok(f) if f.is_finite() => ParamValue::Float(f),
            _ => ParamValue::Text(text.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Extra driver parameters, ordered by name.
pub type AdditionalParams = BTreeMap<String, ParamValue>;

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

/// One stored credential profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub host: String,
    /// Expected to be 1-65535; not enforced on save.
    pub port: u32,
    pub database_name: String,
    pub username: String,
    pub password_encrypted: Ciphertext,
    pub connection_type: ConnectionType,
    #[serde(default = "default_true")]
    pub ssl_enabled: bool,
    #[serde(default = "default_true")]
    pub is_readonly: bool,
    #[serde(default)]
    pub additional_params: AdditionalParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Everything a caller supplies to `save`.
///
/// Defaults (`ssl_enabled`, `is_readonly`, empty params) are applied
/// by whoever builds this value, not by the store.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub username: String,
    pub password: Zeroizing<String>,
    pub connection_type: ConnectionType,
    pub ssl_enabled: bool,
    pub is_readonly: bool,
    pub additional_params: AdditionalParams,
}

// ---------------------------------------------------------------------------
// Views returned by store operations
// ---------------------------------------------------------------------------

/// Non-secret summary returned by `save`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSummary {
    pub project_name: String,
    pub connection_name: String,
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub connection_type: ConnectionType,
    pub is_readonly: bool,
}

/// Full details of one connection, returned by `get`.
///
/// `password` is only populated when the caller asked for it; it then
/// holds either the plaintext or `DECRYPTION_ERROR_SENTINEL`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub project_name: String,
    pub connection_name: String,
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub connection_type: ConnectionType,
    pub ssl_enabled: bool,
    pub is_readonly: bool,
    pub additional_params: AdditionalParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionView {
    /// Whether decryption was attempted and failed.
    pub fn password_unreadable(&self) -> bool {
        self.password.as_deref() == Some(DECRYPTION_ERROR_SENTINEL)
    }
}

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSummary {
    pub project_name: String,
    pub connection_name: String,
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub connection_type: ConnectionType,
    pub is_readonly: bool,
    pub created_at: DateTime<Utc>,
}

/// Returned by `delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteConfirmation {
    pub project_name: String,
    pub connection_name: String,
    /// `true` when this was the project's last connection and the
    /// project itself was removed.
    pub project_removed: bool,
}

/// Returned by `test`.  No network traffic is involved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestReport {
    pub project_name: String,
    pub connection_name: String,
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub connection_type: ConnectionType,
    pub ssl_enabled: bool,
    pub well_formed: bool,
    pub issues: Vec<String>,
    pub live_check_performed: bool,
    pub note: String,
}

/// Disclaimer attached to every `TestReport`.
pub const TEST_DISCLAIMER: &str = "This is a structural validation only. No connection to the \
database was attempted; live connectivity testing requires database drivers.";

impl ConnectionRecord {
    pub(crate) fn summary(&self, project: &str, connection: &str) -> ConnectionSummary {
        ConnectionSummary {
            project_name: project.to_string(),
            connection_name: connection.to_string(),
            host: self.host.clone(),
            port: self.port,
            database_name: self.database_name.clone(),
            connection_type: self.connection_type,
            is_readonly: self.is_readonly,
            created_at: self.created_at,
        }
    }

    /// Structural problems with this record, empty when well formed.
    pub(crate) fn structural_issues(&self) -> Vec<String> {
        use crate::crypto::encryption::{BLOCK_LEN, IV_LEN};

        let mut issues = Vec::new();

        if !(1..=65_535).contains(&self.port) {
            issues.push(format!("port {} is outside 1-65535", self.port));
        }
        if self.database_name.trim().is_empty() {
            issues.push("database_name is empty".to_string());
        }
        if self.connection_type.is_networked() && self.host.trim().is_empty() {
            issues.push(format!("host is empty for a {} connection", self.connection_type));
        }

        let ct = &self.password_encrypted;
        match ct.iv_bytes() {
            Ok(iv) if iv.len() != IV_LEN => issues.push(format!(
                "password IV is {} bytes, expected {IV_LEN}",
                iv.len()
            )),
            Ok(_) => {}
            Err(_) => issues.push("password IV is not valid hex".to_string()),
        }
        match ct.encrypted_bytes() {
            Ok(bytes) if bytes.is_empty() || bytes.len() % BLOCK_LEN != 0 => issues.push(format!(
                "password ciphertext is {} bytes, expected a non-empty multiple of {BLOCK_LEN}",
                bytes.len()
            )),
            Ok(_) => {}
            Err(_) => issues.push("password ciphertext is not valid hex".to_string()),
        }
        if ct.mac_bytes().is_err() {
            issues.push("password MAC is not valid hex".to_string());
        }

        issues
    }
}
