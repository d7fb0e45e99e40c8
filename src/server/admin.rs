//! Administrative tools: connect, disconnect, health and shutdown
//!
//! These stay responsive while graph queries or connect attempts are stuck.
//! Only `connect_neo4j` queues behind another connect attempt.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::db::{ConcurrencyGate, ConnectionManager, Credentials};
use crate::operations::validators::{bool_arg, required_str};
use crate::protocol::ToolResult;
use crate::shutdown::{ShutdownRequest, StopSignal};
use crate::tools::Arguments;
use crate::types::{McpError, Result};

pub const SERVER_NAME: &str = "neo4j-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const MSG_SHUTDOWN_ACCEPTED: &str = "Shutdown signal accepted. Server will terminate shortly.";
pub const MSG_SHUTDOWN_IN_PROGRESS: &str = "Shutdown already in progress.";
pub const MSG_SHUTDOWN_UNSUPPORTED: &str = "Shutdown not supported in this context (no stop event).";

#[derive(Clone)]
pub struct AdminTools {
    connection: Arc<ConnectionManager>,
    gate: Arc<ConcurrencyGate>,
    started: Instant,
    stop: Option<StopSignal>,
}

impl AdminTools {
    pub fn new(
        connection: Arc<ConnectionManager>,
        gate: Arc<ConcurrencyGate>,
        stop: Option<StopSignal>,
    ) -> Self {
        Self {
            connection,
            gate,
            started: Instant::now(),
            stop,
        }
    }

    /// `uri`, `username`, `password`, optional `force`
    pub async fn connect_neo4j(&self, arguments: &Arguments) -> Result<ToolResult> {
        let uri = required_str(arguments, "uri")?;
        let username = required_str(arguments, "username")?;
        let password = required_str(arguments, "password")?;
        let force = bool_arg(arguments, "force", false)?;

        let message = self
            .connection
            .reconnect(Credentials::new(uri, username, password), force)
            .await?;
        Ok(ToolResult::text(message))
    }

    pub async fn disconnect_neo4j(&self) -> Result<ToolResult> {
        let message = self.connection.disconnect().await?;
        Ok(ToolResult::text(message))
    }

    /// Plain `key=value` report. Reads only published snapshots.
    pub fn health_check(&self) -> ToolResult {
        let status = self.connection.status();
        let metrics = self.gate.metrics();

        let mut report = String::from("Health Check:\n");
        let _ = writeln!(report, "server_name={}", SERVER_NAME);
        let _ = writeln!(report, "server_version={}", SERVER_VERSION);
        let _ = writeln!(report, "connected={}", status.connected);
        let _ = writeln!(
            report,
            "neo4j_uri={}",
            status.endpoint.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(report, "uptime_seconds={:.2}", self.started.elapsed().as_secs_f64());
        let _ = writeln!(report, "max_concurrency={}", metrics.max_concurrency);
        let _ = writeln!(report, "active_operations={}", metrics.active_operations);
        let _ = writeln!(report, "available_slots={}", metrics.available_slots);
        let _ = write!(
            report,
            "default_query_timeout_seconds={}",
            metrics.default_query_timeout_seconds
        );
        ToolResult::text(report)
    }

    pub fn shutdown_server(&self) -> Result<ToolResult> {
        let stop = self
            .stop
            .as_ref()
            .ok_or_else(|| McpError::Operation(MSG_SHUTDOWN_UNSUPPORTED.to_string()))?;

        match stop.request_shutdown("shutdown request via tool") {
            ShutdownRequest::Accepted => {
                info!("Shutdown requested through shutdown_server");
                Ok(ToolResult::text(MSG_SHUTDOWN_ACCEPTED))
            }
            ShutdownRequest::AlreadyInProgress => Ok(ToolResult::text(MSG_SHUTDOWN_IN_PROGRESS)),
        }
    }
}
