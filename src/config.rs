//! Configuration for the Neo4j MCP server
//!
//! CLI arguments and environment variable handling using clap. Connection
//! credentials are CLI-only here; when they are incomplete the connection
//! manager falls back to `NEO4J_URI`, `NEO4J_USERNAME` and `NEO4J_PASSWORD`.

use clap::Parser;
use std::time::Duration;

use crate::db::gate::{DEFAULT_MAX_CONCURRENCY, DEFAULT_QUERY_TIMEOUT};
use crate::db::Credentials;

/// Slack between the per-query deadline and the per-tool deadline
const TOOL_TIMEOUT_SLACK_SECS: u64 = 5;

/// Neo4j MCP server
///
/// Exposes a Neo4j knowledge graph as MCP tools over stdio.
#[derive(Parser, Debug, Clone)]
#[command(name = "neo4j-mcp")]
#[command(about = "MCP server exposing a Neo4j knowledge graph over stdio", version)]
pub struct Args {
    /// Neo4j connection URI (e.g., neo4j://localhost:7687)
    #[arg(long)]
    pub neo4j_uri: Option<String>,

    /// Neo4j username
    #[arg(long)]
    pub neo4j_username: Option<String>,

    /// Neo4j password
    #[arg(long)]
    pub neo4j_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum concurrent queries against the shared connection
    /// (non-positive values fall back to the default of 10)
    #[arg(long, env = "NEO4J_MAX_CONCURRENCY", allow_negative_numbers = true)]
    pub max_concurrency: Option<i64>,

    /// Deadline for a single query, in seconds
    #[arg(long, env = "NEO4J_QUERY_TIMEOUT_SECS", default_value = "10")]
    pub query_timeout_secs: u64,

    /// Deadline for a whole tool call, in seconds (default: query timeout + 5)
    #[arg(long, env = "NEO4J_TOOL_TIMEOUT_SECS")]
    pub tool_timeout_secs: Option<u64>,

    /// Skip the connection attempt at startup; connect on first use instead
    #[arg(long, env = "NEO4J_NO_EAGER_CONNECT", default_value = "false")]
    pub no_eager_connect: bool,

    /// Log every tool call and result (passwords redacted)
    #[arg(long, env = "NEO4J_TRACE_FRAMES", default_value = "false")]
    pub trace_frames: bool,
}

/// Runtime settings consumed by the library
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_concurrency: Option<i64>,
    pub query_timeout: Duration,
    pub tool_timeout: Duration,
    /// How long shutdown waits for in-flight calls
    pub drain_timeout: Duration,
    pub trace_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let tool_timeout = DEFAULT_QUERY_TIMEOUT + Duration::from_secs(TOOL_TIMEOUT_SLACK_SECS);
        Self {
            max_concurrency: Some(DEFAULT_MAX_CONCURRENCY as i64),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            tool_timeout,
            drain_timeout: tool_timeout,
            trace_frames: false,
        }
    }
}

impl Args {
    /// Effective tool deadline in seconds
    pub fn tool_timeout_secs(&self) -> u64 {
        self.tool_timeout_secs
            .unwrap_or(self.query_timeout_secs + TOOL_TIMEOUT_SLACK_SECS)
    }

    /// Explicit credentials, only when all three are present and non-empty
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(
            self.neo4j_uri.as_deref(),
            self.neo4j_username.as_deref(),
            self.neo4j_password.as_deref(),
        )
    }

    pub fn server_config(&self) -> ServerConfig {
        let tool_timeout = Duration::from_secs(self.tool_timeout_secs());
        ServerConfig {
            max_concurrency: self.max_concurrency,
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            tool_timeout,
            drain_timeout: tool_timeout,
            trace_frames: self.trace_frames,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.query_timeout_secs == 0 {
            return Err("NEO4J_QUERY_TIMEOUT_SECS must be greater than zero".to_string());
        }
        if self.tool_timeout_secs() == 0 {
            return Err("NEO4J_TOOL_TIMEOUT_SECS must be greater than zero".to_string());
        }
        Ok(())
    }
}
