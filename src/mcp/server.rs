//! MCP server over stdio.
//!
//! Reads one JSON-RPC message per line from stdin and writes one
//! response per line to stdout.  Tool calls are forwarded to the
//! `CredentialStore`; their results and failures are rendered as text.
//! A failing tool never ends the loop; only EOF on stdin does.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use super::tools::{self, GetArgs, ListArgs, SaveArgs, TargetArgs, Tool};
use crate::errors::{Result, VaultError};
use crate::vault::{
    ConnectionSummary, ConnectionView, CredentialStore, DeleteConfirmation, SavedSummary, TestReport,
};

/// Server info for initialization
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "connvault".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// MCP server
pub struct McpServer {
    store: CredentialStore,
    server_info: ServerInfo,
}

impl McpServer {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            server_info: ServerInfo::default(),
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Handle one JSON-RPC request.  Notifications return `None`.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        if request.is_notification() {
            if request.method == "notifications/initialized" {
                info!("client finished initialization");
            } else {
                debug!(method = %request.method, "ignoring notification");
            }
            return None;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            other => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    /// Handle one raw input line, returning the serialized response.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request)?,
            Err(e) => {
                warn!("unparsable message: {e}");
                JsonRpcResponse::error(None, error_codes::PARSE_ERROR, format!("Parse error: {e}"))
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("failed to serialize response: {e}");
                None
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("MCP server initializing");

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": self.server_info
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": tools::definitions() }))
    }

    fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing params");
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name");
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let (text, is_error) = match self.call_tool(name, arguments) {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(tool = name, "tool call failed: {e}");
                (format!("Error: {e}"), true)
            }
        };

        JsonRpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": is_error
            }),
        )
    }

    /// Run a tool by name and render its result as text.
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let tool: Tool = name.parse()?;

        match tool {
            Tool::SaveDb => {
                let args: SaveArgs = tools::parse_args(tool, arguments)?;
                let (project, connection, input) = args.into_input()?;
                let saved = self.store.save(&project, &connection, input)?;
                Ok(render_saved(&saved))
            }
            Tool::GetDb => {
                let args: GetArgs = tools::parse_args(tool, arguments)?;
                let view =
                    self.store
                        .get(&args.project_name, &args.connection_name, args.include_password)?;
                render_view(&view)
            }
            Tool::ListDb => {
                let args: ListArgs = tools::parse_args(tool, arguments)?;
                let rows = self.store.list(args.project_name.as_deref())?;
                render_list(&rows)
            }
            Tool::DeleteDb => {
                let args: TargetArgs = tools::parse_args(tool, arguments)?;
                let confirmation = self.store.delete(&args.project_name, &args.connection_name)?;
                Ok(render_deleted(&confirmation))
            }
            Tool::TestDb => {
                let args: TargetArgs = tools::parse_args(tool, arguments)?;
                let report = self.store.test(&args.project_name, &args.connection_name)?;
                Ok(render_test(&report))
            }
        }
    }

    /// Serve requests from `input` until EOF, writing responses to `output`.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line) {
                output.write_all(response.as_bytes())?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
        }
        Ok(())
    }

    /// Run the server on stdin/stdout.
    pub fn run_stdio(&self) -> Result<()> {
        info!(store = %self.store.path().display(), "MCP server running on stdio");

        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())?;

        info!("stdin closed, shutting down");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn to_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| VaultError::SerializationError(e.to_string()))
}

fn render_saved(saved: &SavedSummary) -> String {
    format!(
        "Database connection saved successfully!\n\n\
         Project: {}\nConnection: {}\nHost: {}:{}\nDatabase: {}\nType: {}\nRead-only: {}",
        saved.project_name,
        saved.connection_name,
        saved.host,
        saved.port,
        saved.database_name,
        saved.connection_type,
        saved.is_readonly
    )
}

fn render_view(view: &ConnectionView) -> Result<String> {
    Ok(format!("Database Connection Details:\n\n{}", to_pretty(view)?))
}

fn render_list(rows: &[ConnectionSummary]) -> Result<String> {
    Ok(format!("Database Connections:\n\n{}", to_pretty(&rows)?))
}

fn render_deleted(confirmation: &DeleteConfirmation) -> String {
    let mut text = format!(
        "Connection '{}' deleted from project '{}'",
        confirmation.connection_name, confirmation.project_name
    );
    if confirmation.project_removed {
        text.push_str(&format!(
            "\nProject '{}' has no connections left and was removed.",
            confirmation.project_name
        ));
    }
    text
}

fn render_test(report: &TestReport) -> String {
    let structure = if report.well_formed {
        "OK".to_string()
    } else {
        let issues: Vec<String> = report.issues.iter().map(|i| format!("  - {i}")).collect();
        format!("{} issue(s)\n{}", report.issues.len(), issues.join("\n"))
    };

    format!(
        "Connection Test Results:\n\n\
         Project: {}\nConnection: {}\nHost: {}:{}\nDatabase: {}\nType: {}\nSSL: {}\n\
         Structure: {}\n\nNote: {}",
        report.project_name,
        report.connection_name,
        report.host,
        report.port,
        report.database_name,
        report.connection_type,
        report.ssl_enabled,
        structure,
        report.note
    )
}
