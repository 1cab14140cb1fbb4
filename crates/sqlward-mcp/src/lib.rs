//! MCP server for the Sqlward gateway.
//!
//! Exposes the gateway's four actions as MCP tools over JSON-RPC 2.0 on
//! stdio. This layer only parses arguments and serializes structured
//! results; all policy and data assembly happens in the engine.

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use server::McpServer;
