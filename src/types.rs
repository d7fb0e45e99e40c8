//! Error types for the Neo4j MCP server
//!
//! Every variant is eventually rendered into a [`ToolResult`] with the error
//! flag set; nothing here is allowed to escape the dispatcher as a fault.
//!
//! [`ToolResult`]: crate::protocol::ToolResult

use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    /// Required argument missing or empty. Never touches the connection.
    #[error("Missing required argument(s) for {tool}: {}", .missing.join(", "))]
    Validation { tool: String, missing: Vec<String> },

    #[error("Not connected to Neo4j. Please connect first.")]
    NotConnected,

    /// Probe or fallback query failed; the handle has already been torn down.
    #[error("Failed to connect to Neo4j: {0}")]
    Connect(String),

    /// Handler-level failure (bad argument shape, query failure, ...)
    #[error("{0}")]
    Operation(String),

    #[error("Tool '{0}' execution timed out")]
    Timeout(String),

    #[error("Unknown tool: {0}")]
    UnknownOperation(String),

    /// Panic or other uncaught fault inside a handler.
    #[error("Error: {0}")]
    Unexpected(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Build a validation error for `tool` naming every missing argument
    pub fn missing_arguments(tool: &str, missing: Vec<String>) -> Self {
        McpError::Validation {
            tool: tool.to_string(),
            missing,
        }
    }

    /// Short machine-friendly category, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Validation { .. } => "validation",
            McpError::NotConnected => "not_connected",
            McpError::Connect(_) => "connect",
            McpError::Operation(_) => "operation",
            McpError::Timeout(_) => "timeout",
            McpError::UnknownOperation(_) => "unknown_operation",
            McpError::Unexpected(_) => "unexpected",
            McpError::Driver(_) => "driver",
            McpError::Shutdown(_) => "shutdown",
            McpError::Io(_) => "io",
            McpError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, McpError>;
