//! MCP tool catalogue: names, input schemas, and the validating registry

pub mod definitions;
pub mod names;
pub mod registry;

pub use definitions::{get_tool_definitions, ToolDefinition};
pub use registry::{Arguments, ToolDescriptor, ToolKind, ToolRegistry};
