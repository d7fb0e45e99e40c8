//! Static tool registry
//!
//! Built once at startup from [`get_tool_definitions`] and read-only after.
//! Holds each tool's required arguments and whether the call runs under the
//! dispatcher's deadline.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::definitions::{get_tool_definitions, ToolDefinition};
use super::names::{DISCONNECT_NEO4J, HEALTH_CHECK, SHUTDOWN_SERVER};
use crate::types::{McpError, Result};

/// Arguments of one tool call
pub type Arguments = Map<String, Value>;

/// How the dispatcher runs a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// May touch the connection; wrapped in the per-call deadline
    Bounded,
    /// Must stay responsive even when the connection is stuck
    Administrative,
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub definition: ToolDefinition,
    pub required: Vec<String>,
    pub kind: ToolKind,
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            tools: HashMap::with_capacity(16),
            order: Vec::with_capacity(16),
        };
        for definition in get_tool_definitions() {
            let kind = match definition.name.as_str() {
                HEALTH_CHECK | DISCONNECT_NEO4J | SHUTDOWN_SERVER => ToolKind::Administrative,
                _ => ToolKind::Bounded,
            };
            registry.insert(ToolDescriptor {
                required: definition.required_arguments(),
                definition,
                kind,
            });
        }
        registry
    }

    fn insert(&mut self, descriptor: ToolDescriptor) {
        let name = descriptor.name().to_string();
        if self.tools.insert(name.clone(), descriptor).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Unknown names are treated as bounded
    pub fn kind(&self, name: &str) -> ToolKind {
        self.get(name).map(|d| d.kind).unwrap_or(ToolKind::Bounded)
    }

    /// Definitions in catalogue order, for `tools/list`
    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|d| &d.definition)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check that every required argument is present and non-empty.
    ///
    /// A missing key, `null` and `""` all count as missing; every missing
    /// name is reported in one error. Unknown tools pass through untouched.
    pub fn validate(&self, name: &str, arguments: &Arguments) -> Result<()> {
        let Some(descriptor) = self.get(name) else {
            return Ok(());
        };
        let missing: Vec<String> = descriptor
            .required
            .iter()
            .filter(|arg| is_missing(arguments.get(arg.as_str())))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(McpError::missing_arguments(name, missing))
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
