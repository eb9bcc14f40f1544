//! MCP (Model Context Protocol) front end over stdio.
//!
//! - JSON-RPC envelopes (`protocol`)
//! - Tool schemas and argument parsing (`tools`)
//! - Request dispatch and the stdio loop (`server`)

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
