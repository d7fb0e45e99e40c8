//! Dispatch interceptors.
//!
//! Interceptors observe every tool call that reaches the [`Dispatcher`]:
//! once before validation and once with the final envelope. They can not
//! alter either. [`FrameLogger`] is the built-in one, enabled with
//! `--trace-frames`.
//!
//! [`Dispatcher`]: crate::server::Dispatcher

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::protocol::ToolResult;
use crate::tools::Arguments;

/// Hooks around one tool dispatch
pub trait DispatchInterceptor: Send + Sync {
    fn on_call(&self, _tool: &str, _arguments: &Arguments) {}

    fn on_result(&self, _tool: &str, _result: &ToolResult, _elapsed: Duration) {}
}

/// Argument keys whose values never reach the log
const REDACTED_KEYS: [&str; 1] = ["password"];

/// Logs each call and its outcome, with secrets redacted
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameLogger;

impl FrameLogger {
    pub fn new() -> Self {
        Self
    }
}

impl DispatchInterceptor for FrameLogger {
    fn on_call(&self, tool: &str, arguments: &Arguments) {
        let redacted = Value::Object(redact(arguments));
        trace!(tool = %tool, arguments = %redacted, "<- tool call");
    }

    fn on_result(&self, tool: &str, result: &ToolResult, elapsed: Duration) {
        debug!(
            tool = %tool,
            is_error = result.is_error,
            elapsed_ms = elapsed.as_millis() as u64,
            "-> tool result"
        );
        trace!(tool = %tool, text = %result.text_content(), "-> tool result body");
    }
}

/// Copy of `arguments` with secret values replaced
pub fn redact(arguments: &Arguments) -> Arguments {
    arguments
        .iter()
        .map(|(key, value)| {
            if REDACTED_KEYS.contains(&key.as_str()) {
                (key.clone(), Value::String("***".to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}
