//! Error types for the MCP crate.

use thiserror::Error;

/// Errors that can occur in the MCP server itself. Failures of the
/// underlying gateway operations are reported inside tool responses, not
/// through this type.
#[derive(Debug, Error)]
pub enum McpError {
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error on the stdio transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
