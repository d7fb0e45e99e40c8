//! Guarded query execution
//!
//! [`Database::run_query`] is the one path every graph operation takes to the
//! shared connection: connect if pending, validate the query text, take a
//! gate slot, run under the per-query deadline, and render the rows.

use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, error};

use super::connection::ConnectionManager;
use super::driver::{Params, Record};
use super::gate::ConcurrencyGate;
use crate::protocol::ToolResult;
use crate::types::{McpError, Result};

pub const MAX_QUERY_LENGTH: usize = 10_000;
pub const MAX_RESULT_LENGTH: usize = 10_000;
const TRUNCATION_MARKER: &str = "… (truncated)";
pub const NO_RESULTS: &str = "Query executed successfully. No results returned.";

#[derive(Clone)]
pub struct Database {
    connection: Arc<ConnectionManager>,
    gate: Arc<ConcurrencyGate>,
}

impl Database {
    pub fn new(connection: Arc<ConnectionManager>, gate: Arc<ConcurrencyGate>) -> Self {
        Self { connection, gate }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    /// Run `query` and format every returned row as text
    pub async fn run_query(&self, query: &str, params: Params) -> Result<ToolResult> {
        let handle = self.connection.ensure_connected().await?;

        if query.trim().is_empty() {
            return Err(McpError::Operation("Query must be a non-empty string".to_string()));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(McpError::Operation(format!(
                "Query too long (>{} chars)",
                MAX_QUERY_LENGTH
            )));
        }
        if is_destructive(query) {
            debug!(
                "Executing potentially destructive query: {}",
                truncate(query, 120)
            );
        }

        let _permit = self.gate.acquire().await?;
        let timeout = self.gate.query_timeout();
        let records = match tokio::time::timeout(timeout, handle.run(query, params)).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!("Query execution failed: {}", e);
                return Err(McpError::Operation(format!("Query execution failed: {}", e)));
            }
            Err(_) => {
                error!("Query exceeded {}s deadline", timeout.as_secs());
                return Err(McpError::Operation(format!(
                    "Query execution failed: query timed out after {} seconds",
                    timeout.as_secs()
                )));
            }
        };

        Ok(ToolResult::text(format_records(&records)))
    }
}

/// `DETACH DELETE` anywhere in the text, any case, any whitespace between
fn is_destructive(query: &str) -> bool {
    let words: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    words.windows(2).any(|pair| pair[0] == "DETACH" && pair[1] == "DELETE")
}

/// Render rows as `Record N: {...}` lines under a `Query Results:` header
pub fn format_records(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_RESULTS.to_string();
    }
    let mut text = String::from("Query Results:\n");
    for (i, record) in records.iter().enumerate() {
        let rendered = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());
        let _ = writeln!(text, "Record {}: {}", i + 1, rendered);
    }
    truncate(&text, MAX_RESULT_LENGTH)
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
