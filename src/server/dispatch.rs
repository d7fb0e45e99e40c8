//! Tool call dispatcher
//!
//! [`Dispatcher::handle`] is the single entry point for `tools/call`. It
//! always returns a [`ToolResult`]: validation failures, unknown tools,
//! handler errors, deadline expiry and handler panics all come back as error
//! envelopes and never reach the transport.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::middleware::DispatchInterceptor;
use crate::protocol::ToolResult;
use crate::tools::{Arguments, ToolKind, ToolRegistry};
use crate::types::{McpError, Result};

/// Something that can serve one tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Arguments) -> Result<ToolResult>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolResult>> + Send,
{
    async fn call(&self, arguments: Arguments) -> Result<ToolResult> {
        (self.0)(arguments).await
    }
}

/// Wrap an async closure as a handler
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Handler that clones `target` into each call
pub fn route<T, F, Fut>(target: T, f: F) -> Arc<dyn ToolHandler>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult>> + Send + 'static,
{
    handler_fn(move |arguments| f(target.clone(), arguments))
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    tool_timeout: Duration,
    interceptors: Vec<Arc<dyn DispatchInterceptor>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self {
            registry,
            handlers: HashMap::new(),
            tool_timeout,
            interceptors: Vec::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            warn!(tool = %name, "Replaced existing tool handler");
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn DispatchInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn add_interceptor(&mut self, interceptor: Arc<dyn DispatchInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Validate, route and run one tool call
    pub async fn handle(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        let started = Instant::now();
        let result = match arguments_map(name, arguments) {
            Ok(arguments) => {
                for interceptor in &self.interceptors {
                    interceptor.on_call(name, &arguments);
                }
                self.run(name, arguments).await
            }
            Err(e) => ToolResult::from(e),
        };
        let elapsed = started.elapsed();
        for interceptor in &self.interceptors {
            interceptor.on_result(name, &result, elapsed);
        }
        result
    }

    async fn run(&self, name: &str, arguments: Arguments) -> ToolResult {
        if let Err(e) = self.registry.validate(name, &arguments) {
            debug!(tool = %name, "Rejected tool call: {}", e);
            return e.into();
        }

        let Some(handler) = self.handlers.get(name).cloned() else {
            warn!(tool = %name, "Unknown tool requested");
            return McpError::UnknownOperation(name.to_string()).into();
        };

        let call = AssertUnwindSafe(handler.call(arguments)).catch_unwind();
        let outcome = match self.registry.kind(name) {
            ToolKind::Administrative => call.await,
            ToolKind::Bounded => match tokio::time::timeout(self.tool_timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        tool = %name,
                        timeout_secs = self.tool_timeout.as_secs_f64(),
                        "Tool execution timed out"
                    );
                    return McpError::Timeout(name.to_string()).into();
                }
            },
        };

        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                debug!(tool = %name, kind = e.kind(), "Tool returned error: {}", e);
                e.into()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = %name, "Error in tool call: {}", message);
                McpError::Unexpected(message).into()
            }
        }
    }
}

fn arguments_map(name: &str, arguments: Option<Value>) -> Result<Arguments> {
    match arguments {
        None | Some(Value::Null) => Ok(Arguments::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(McpError::Operation(format!(
            "Arguments for {} must be an object",
            name
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{creds, MockDriver, Probe};
    use crate::db::{ConcurrencyGate, ConnectionManager};
    use crate::tools::names::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn dispatcher(timeout: Duration) -> Dispatcher {
        Dispatcher::new(Arc::new(ToolRegistry::new()), timeout)
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> Arc<dyn ToolHandler> {
        handler_fn(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, McpError>(ToolResult::text("ok"))
            }
        })
    }

    #[tokio::test]
    async fn test_validation_failure_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut d = dispatcher(Duration::from_secs(1));
        d.register(FIND_NODES, counting_handler(Arc::clone(&calls)));

        let result = d.handle(FIND_NODES, Some(json!({ "name": "" }))).await;
        assert!(result.is_error);
        assert_eq!(
            result.text_content(),
            "Missing required argument(s) for find_nodes: name"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let d = dispatcher(Duration::from_secs(1));
        let result = d.handle("drop_database", Some(json!({}))).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Unknown tool: drop_database");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_envelope() {
        let mut d = dispatcher(Duration::from_secs(1));
        d.register(
            RUN_CYPHER_QUERY,
            handler_fn(|_| async {
                Err::<ToolResult, _>(McpError::Operation("Query execution failed: boom".into()))
            }),
        );

        let result = d.handle(RUN_CYPHER_QUERY, Some(json!({ "query": "RETURN 1" }))).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Query execution failed: boom");
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let mut d = dispatcher(Duration::from_secs(1));
        d.register(
            FIND_NODES,
            handler_fn(|_| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, McpError>(ToolResult::text("unreachable"))
            }),
        );

        let result = d.handle(FIND_NODES, Some(json!({ "name": "x" }))).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Error: kaboom");
    }

    #[tokio::test]
    async fn test_stuck_handler_times_out_and_frees_gate() {
        let gate = Arc::new(ConcurrencyGate::new(Some(1), Duration::from_secs(60)));
        let mut d = dispatcher(Duration::from_millis(30));
        d.register(
            RUN_CYPHER_QUERY,
            route(Arc::clone(&gate), |gate, _| async move {
                let _permit = gate.acquire().await?;
                std::future::pending::<()>().await;
                Ok::<_, McpError>(ToolResult::text("never"))
            }),
        );

        let result = d.handle(RUN_CYPHER_QUERY, Some(json!({ "query": "RETURN 1" }))).await;
        assert_eq!(result.text_content(), "Tool 'run_cypher_query' execution timed out");
        assert_eq!(gate.metrics().available_slots, 1);
    }

    #[tokio::test]
    async fn test_administrative_tools_are_not_deadlined() {
        let mut d = dispatcher(Duration::from_millis(10));
        d.register(
            HEALTH_CHECK,
            handler_fn(|_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, McpError>(ToolResult::text("healthy"))
            }),
        );

        let result = d.handle(HEALTH_CHECK, None).await;
        assert!(result.is_success());
        assert_eq!(result.text_content(), "healthy");
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let d = dispatcher(Duration::from_secs(1));
        let result = d.handle(FIND_NODES, Some(json!(["x"]))).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Arguments for find_nodes must be an object");
    }

    #[tokio::test]
    async fn test_handler_surfaces_connect_failure_without_retry() {
        let driver = MockDriver::new(Probe::OpenFails);
        let connection = Arc::new(ConnectionManager::with_credentials(driver.clone(), Some(creds())));
        let mut d = dispatcher(Duration::from_secs(1));
        d.register(
            RUN_CYPHER_QUERY,
            route(Arc::clone(&connection), |connection, _| async move {
                connection.ensure_connected().await?;
                Ok::<_, McpError>(ToolResult::text("ran"))
            }),
        );

        let result = d.handle(RUN_CYPHER_QUERY, Some(json!({ "query": "RETURN 1" }))).await;
        assert!(result.is_error);
        assert!(result.text_content().starts_with("Failed to connect to Neo4j:"));
    }

    #[tokio::test]
    async fn test_timed_out_auto_connect_can_be_retried() {
        let driver = MockDriver::new(Probe::Ok);
        driver.set_open_delay(Duration::from_millis(200));
        let connection = Arc::new(ConnectionManager::with_credentials(driver.clone(), Some(creds())));
        let mut d = dispatcher(Duration::from_millis(50));
        d.register(
            RUN_CYPHER_QUERY,
            route(Arc::clone(&connection), |connection, _| async move {
                connection.ensure_connected().await?;
                Ok::<_, McpError>(ToolResult::text("ran"))
            }),
        );

        let first = d.handle(RUN_CYPHER_QUERY, Some(json!({ "query": "RETURN 1" }))).await;
        assert_eq!(first.text_content(), "Tool 'run_cypher_query' execution timed out");
        assert!(connection.status().pending);

        driver.set_open_delay(Duration::ZERO);
        let second = d.handle(RUN_CYPHER_QUERY, Some(json!({ "query": "RETURN 1" }))).await;
        assert!(second.is_success());
        assert_eq!(second.text_content(), "ran");
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        results: Mutex<Vec<bool>>,
    }

    impl DispatchInterceptor for Recorder {
        fn on_call(&self, tool: &str, _arguments: &Arguments) {
            self.calls.lock().unwrap().push(tool.to_string());
        }

        fn on_result(&self, _tool: &str, result: &ToolResult, _elapsed: Duration) {
            self.results.lock().unwrap().push(result.is_error);
        }
    }

    #[tokio::test]
    async fn test_interceptors_see_every_call() {
        let recorder = Arc::new(Recorder::default());
        let d = dispatcher(Duration::from_secs(1)).with_interceptor(recorder.clone());

        d.handle(FIND_NODES, None).await;
        d.handle("nope", None).await;

        assert_eq!(*recorder.calls.lock().unwrap(), vec![FIND_NODES, "nope"]);
        assert_eq!(*recorder.results.lock().unwrap(), vec![true, true]);
    }
}
