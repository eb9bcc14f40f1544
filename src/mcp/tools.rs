//! Tool definitions advertised over `tools/list`, and parsing of
//! `tools/call` arguments into typed store inputs.
//!
//! Defaults for optional arguments live here, not in the store:
//! `connection_name = "main"`, `ssl_enabled = true`,
//! `is_readonly = true`, `include_password = false`.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};
use crate::vault::{AdditionalParams, ConnectionType, NewConnection, ParamValue, DEFAULT_CONNECTION};

/// Tool definition for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input schema (JSON Schema)
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The tools this server dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    SaveDb,
    GetDb,
    ListDb,
    DeleteDb,
    TestDb,
}

impl Tool {
    pub const ALL: [Tool; 5] = [Tool::SaveDb, Tool::GetDb, Tool::ListDb, Tool::DeleteDb, Tool::TestDb];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::SaveDb => "save_db",
            Tool::GetDb => "get_db",
            Tool::ListDb => "list_db",
            Tool::DeleteDb => "delete_db",
            Tool::TestDb => "test_db",
        }
    }

    /// Name, description and JSON schema for `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Tool::SaveDb => ("Save a new database connection for a project", save_schema()),
            Tool::GetDb => (
                "Retrieve a database connection for a project",
                json!({
                    "type": "object",
                    "properties": {
                        "project_name": { "type": "string", "description": "Name of the project" },
                        "connection_name": connection_name_schema(),
                        "include_password": {
                            "type": "boolean",
                            "description": "Whether to include decrypted password in response",
                            "default": false
                        }
                    },
                    "required": ["project_name"]
                }),
            ),
            Tool::ListDb => (
                "List all database connections, optionally filtered by project",
                json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional project name to filter by"
                        }
                    }
                }),
            ),
            Tool::DeleteDb => ("Delete a database connection", target_schema()),
            Tool::TestDb => (
                "Validate a stored database connection (no live connection is made)",
                target_schema(),
            ),
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

impl FromStr for Tool {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| VaultError::CommandFailed(format!("Unknown tool: {s}")))
    }
}

/// Definitions for every tool, in a stable order.
pub fn definitions() -> Vec<ToolDefinition> {
    Tool::ALL.iter().map(Tool::definition).collect()
}

fn connection_name_schema() -> Value {
    json!({
        "type": "string",
        "description": "Name of the connection",
        "default": DEFAULT_CONNECTION
    })
}

fn target_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project_name": { "type": "string", "description": "Name of the project" },
            "connection_name": connection_name_schema()
        },
        "required": ["project_name"]
    })
}

fn save_schema() -> Value {
    let types: Vec<&str> = ConnectionType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "project_name": {
                "type": "string",
                "description": "Name of the project (e.g., SHOP, PROJECT_ABC)"
            },
            "connection_name": {
                "type": "string",
                "description": "Name for this connection (e.g., main, readonly, backup)",
                "default": DEFAULT_CONNECTION
            },
            "host": { "type": "string", "description": "Database host address" },
            "port": { "type": "integer", "description": "Database port number" },
            "database_name": { "type": "string", "description": "Name of the database" },
            "username": { "type": "string", "description": "Database username" },
            "password": { "type": "string", "description": "Database password (will be encrypted)" },
            "connection_type": { "type": "string", "enum": types, "description": "Type of database" },
            "ssl_enabled": { "type": "boolean", "description": "Whether SSL is enabled", "default": true },
            "is_readonly": {
                "type": "boolean",
                "description": "Whether this is a read-only connection",
                "default": true
            },
            "additional_params": {
                "type": "object",
                "description": "Additional connection parameters (string, number or boolean values)"
            }
        },
        "required": [
            "project_name", "host", "port", "database_name",
            "username", "password", "connection_type"
        ]
    })
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

fn default_connection() -> String {
    DEFAULT_CONNECTION.to_string()
}

fn default_true() -> bool {
    true
}

/// Arguments of `save_db`.
#[derive(Debug, Deserialize)]
pub struct SaveArgs {
    pub project_name: String,
    #[serde(default = "default_connection")]
    pub connection_name: String,
    pub host: String,
    pub port: u32,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub connection_type: String,
    #[serde(default = "default_true")]
    pub ssl_enabled: bool,
    #[serde(default = "default_true")]
    pub is_readonly: bool,
    #[serde(default)]
    pub additional_params: Map<String, Value>,
}

impl SaveArgs {
    /// Validate the loosely typed fields and build the store input.
    pub fn into_input(self) -> Result<(String, String, NewConnection)> {
        let connection_type = ConnectionType::from_str(&self.connection_type)?;

        let additional_params = self
            .additional_params
            .iter()
            .map(|(name, value)| -> Result<(String, ParamValue)> {
                Ok((name.clone(), ParamValue::from_json(name, value)?))
            })
            .collect::<Result<AdditionalParams>>()?;

        let input = NewConnection {
            host: self.host,
            port: self.port,
            database_name: self.database_name,
            username: self.username,
            password: Zeroizing::new(self.password),
            connection_type,
            ssl_enabled: self.ssl_enabled,
            is_readonly: self.is_readonly,
            additional_params,
        };

        Ok((self.project_name, self.connection_name, input))
    }
}

/// Arguments of `get_db`.
#[derive(Debug, Deserialize)]
pub struct GetArgs {
    pub project_name: String,
    #[serde(default = "default_connection")]
    pub connection_name: String,
    #[serde(default)]
    pub include_password: bool,
}

/// Arguments of `list_db`.
#[derive(Debug, Default, Deserialize)]
pub struct ListArgs {
    #[serde(default)]
    pub project_name: Option<String>,
}

/// Arguments of `delete_db` and `test_db`.
#[derive(Debug, Deserialize)]
pub struct TargetArgs {
    pub project_name: String,
    #[serde(default = "default_connection")]
    pub connection_name: String,
}

/// Decode tool arguments, turning serde's complaint into a validation
/// error that names the tool.
pub fn parse_args<T: DeserializeOwned>(tool: Tool, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| VaultError::validation(format!("invalid arguments for {}: {e}", tool.name())))
}
