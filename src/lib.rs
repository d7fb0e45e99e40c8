//! Neo4j MCP server
//!
//! Exposes a Neo4j knowledge graph to MCP clients over stdio.
//!
//! ## Components
//!
//! - **Connection**: one shared, lazily opened and verified Neo4j connection
//! - **Gate**: bounded admission of concurrent queries with a per-query deadline
//! - **Tools**: catalogue, argument validation and dispatch of every MCP tool
//! - **Operations**: the graph tools (queries, entities, relations, observations)
//! - **Shutdown**: signal handling, draining of in-flight calls, connection close

pub mod config;
pub mod db;
pub mod middleware;
pub mod operations;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod tools;
pub mod types;

pub use config::{Args, ServerConfig};
pub use server::McpServer;
pub use shutdown::{ShutdownCoordinator, StopSignal};
pub use types::{McpError, Result};
