//! MCP server over newline-delimited JSON-RPC
//!
//! [`McpServer::run`] is the primary server loop. It reads one frame per
//! line and answers `initialize`, `ping` and `tools/list` inline. Each
//! `tools/call` is spawned on the server's [`TaskTracker`] so calls overlap
//! and can be drained at shutdown. Every response goes through one writer
//! task.

pub mod admin;
pub mod dispatch;

pub use admin::{AdminTools, SERVER_NAME, SERVER_VERSION};
pub use dispatch::{handler_fn, route, Dispatcher, ToolHandler};

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::db::{ConcurrencyGate, ConnectionManager, Database, GraphDriver};
use crate::middleware::FrameLogger;
use crate::operations::{
    EntityOperations, ObservationOperations, QueryOperations, RelationshipOperations,
    SearchOperations,
};
use crate::protocol::{
    error_codes, JsonRpcId, JsonRpcRequest, JsonRpcResponse, DEFAULT_PROTOCOL_VERSION,
};
use crate::shutdown::StopSignal;
use crate::tools::names::*;
use crate::tools::ToolRegistry;
use crate::types::{McpError, Result};

pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    connection: Arc<ConnectionManager>,
    gate: Arc<ConcurrencyGate>,
    tracker: TaskTracker,
    output: TaskTracker,
    config: ServerConfig,
}

impl McpServer {
    /// Build the server with every tool registered. The connection starts
    /// disconnected; call [`ConnectionManager::configure`] to stage credentials.
    ///
    /// Without a `stop` signal, `shutdown_server` reports that it is unsupported.
    pub fn new(config: ServerConfig, driver: Arc<dyn GraphDriver>, stop: Option<StopSignal>) -> Self {
        let connection = Arc::new(ConnectionManager::new(driver));
        let gate = Arc::new(ConcurrencyGate::new(config.max_concurrency, config.query_timeout));
        let db = Database::new(Arc::clone(&connection), Arc::clone(&gate));

        let mut dispatcher = Dispatcher::new(Arc::new(ToolRegistry::new()), config.tool_timeout);
        if config.trace_frames {
            dispatcher.add_interceptor(Arc::new(FrameLogger::new()));
        }

        let admin = AdminTools::new(Arc::clone(&connection), Arc::clone(&gate), stop);
        dispatcher.register(
            CONNECT_NEO4J,
            route(admin.clone(), |admin, args| async move { admin.connect_neo4j(&args).await }),
        );
        dispatcher.register(
            DISCONNECT_NEO4J,
            route(admin.clone(), |admin, _| async move { admin.disconnect_neo4j().await }),
        );
        dispatcher.register(
            HEALTH_CHECK,
            route(admin.clone(), |admin, _| async move { Ok::<_, McpError>(admin.health_check()) }),
        );
        dispatcher.register(
            SHUTDOWN_SERVER,
            route(admin, |admin, _| async move { admin.shutdown_server() }),
        );

        let query = QueryOperations::new(db.clone());
        dispatcher.register(
            RUN_CYPHER_QUERY,
            route(query, |ops, args| async move { ops.run_cypher_query(&args).await }),
        );

        let search = SearchOperations::new(db.clone());
        dispatcher.register(
            FIND_NODES,
            route(search.clone(), |ops, args| async move { ops.find_nodes(&args).await }),
        );
        dispatcher.register(
            SEARCH_NODES,
            route(search, |ops, args| async move { ops.search_nodes(&args).await }),
        );

        let entities = EntityOperations::new(db.clone());
        dispatcher.register(
            CREATE_ENTITIES,
            route(entities.clone(), |ops, args| async move { ops.create_entities(&args).await }),
        );
        dispatcher.register(
            DELETE_ENTITIES,
            route(entities, |ops, args| async move { ops.delete_entities(&args).await }),
        );

        let relations = RelationshipOperations::new(db.clone());
        dispatcher.register(
            CREATE_RELATIONS,
            route(relations.clone(), |ops, args| async move { ops.create_relations(&args).await }),
        );
        dispatcher.register(
            DELETE_RELATIONS,
            route(relations, |ops, args| async move { ops.delete_relations(&args).await }),
        );

        let observations = ObservationOperations::new(db);
        dispatcher.register(
            ADD_OBSERVATIONS,
            route(observations.clone(), |ops, args| async move {
                ops.add_observations(&args).await
            }),
        );
        dispatcher.register(
            DELETE_OBSERVATIONS,
            route(observations, |ops, args| async move {
                ops.delete_observations(&args).await
            }),
        );

        Self {
            dispatcher: Arc::new(dispatcher),
            connection,
            gate,
            tracker: TaskTracker::new(),
            output: TaskTracker::new(),
            config,
        }
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Tracker holding every in-flight tool call
    pub fn tracker(&self) -> TaskTracker {
        self.tracker.clone()
    }

    /// Tracker holding the response writer. It finishes once the loop and
    /// every call have dropped their response senders.
    pub fn output_tracker(&self) -> TaskTracker {
        self.output.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve frames from `reader` until it reaches EOF.
    ///
    /// Returns an error only when reading fails. Cancelling this future
    /// stops reading; calls already spawned keep running on the tracker.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        self.output.spawn(write_responses(writer, rx));

        info!("Server ready, waiting for requests...");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.map_err(|e| {
            error!("Failed to read from stdin: {}", e);
            e
        })? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!("Received: {} bytes", trimmed.len());

            if let Some(response) = self.handle_frame(trimmed, &tx) {
                // The writer only stops on a broken output stream.
                if tx.send(response).is_err() {
                    warn!("Response writer stopped; dropping response");
                }
            }
        }

        info!("stdin closed (EOF), shutting down...");
        Ok(())
    }

    /// Answer one frame inline, or spawn it and return `None`
    fn handle_frame(
        &self,
        input: &str,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(input) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_REQUEST,
                "Invalid JSON-RPC version",
            ));
        }

        let id = request.id;
        let params = request.params.unwrap_or(Value::Null);
        match request.method.as_str() {
            "initialize" => {
                let protocol_version = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                Some(JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol_version,
                        "capabilities": { "tools": { "listChanged": false } },
                        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION }
                    }),
                ))
            }
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            "tools/list" => Some(JsonRpcResponse::success(
                id,
                json!({ "tools": self.dispatcher.registry().list() }),
            )),
            "tools/call" => self.spawn_call(id, params, tx),
            other => Some(JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        }
    }

    fn spawn_call(
        &self,
        id: Option<JsonRpcId>,
        mut params: Value,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) -> Option<JsonRpcResponse> {
        let Some(name) = params.get("name").and_then(Value::as_str).map(str::to_string) else {
            return Some(JsonRpcResponse::error(
                id,
                error_codes::INVALID_PARAMS,
                "Missing tool name",
            ));
        };
        let arguments = params.get_mut("arguments").map(Value::take);

        let dispatcher = Arc::clone(&self.dispatcher);
        let tx = tx.clone();
        self.tracker.spawn(async move {
            let result = dispatcher.handle(&name, arguments).await;
            let response = match serde_json::to_value(&result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
            };
            if tx.send(response).is_err() {
                warn!(tool = %name, "Response writer stopped; dropping tool result");
            }
        });
        None
    }
}

/// Single writer: one JSON document per line, flushed after each
async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>)
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(response) = rx.recv().await {
        let mut frame = match serde_json::to_vec(&response) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                continue;
            }
        };
        frame.push(b'\n');
        if let Err(e) = writer.write_all(&frame).await {
            error!("Failed to write to stdout: {}", e);
            return;
        }
        if let Err(e) = writer.flush().await {
            error!("Failed to flush stdout: {}", e);
            return;
        }
    }
    debug!("Response writer finished");
}
