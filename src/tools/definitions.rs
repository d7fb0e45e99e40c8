//! Tool definitions returned by `tools/list`.
//!
//! The `required` array of each input schema is also the list the registry
//! validates against before dispatch.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::names::*;

/// MCP tool definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names listed under the schema's `required` key, in order
    pub fn required_arguments(&self) -> Vec<String> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// All thirteen tools, in catalogue order
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            CONNECT_NEO4J,
            "Connect to a Neo4j database (or reconnect). Supports optional forced \
             reconnection if already connected.",
            json!({
                "type": "object",
                "properties": {
                    "uri": {
                        "type": "string",
                        "description": "Neo4j connection URI (e.g., neo4j://localhost:7687). Can sometimes be found in the environment variable NEO4J_URI."
                    },
                    "username": {
                        "type": "string",
                        "description": "Neo4j username, can sometimes be found in the environment variable NEO4J_USERNAME."
                    },
                    "password": {
                        "type": "string",
                        "description": "Neo4j password, can sometimes be found in the environment variable NEO4J_PASSWORD."
                    },
                    "force": {
                        "type": "boolean",
                        "description": "Force reconnect even if a connection already exists (default false)",
                        "default": false
                    }
                },
                "required": ["uri", "username", "password"]
            }),
        ),
        ToolDefinition::new(
            RUN_CYPHER_QUERY,
            "Run a Cypher query against the connected Neo4j database",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Cypher query to execute" },
                    "parameters": {
                        "type": "object",
                        "description": "Query parameters (optional)",
                        "default": {}
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            FIND_NODES,
            "Find nodes by name (exact or partial match)",
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name to search for" },
                    "exact_match": {
                        "type": "boolean",
                        "description": "Whether to use exact matching (default: false)",
                        "default": false
                    },
                    "case_sensitive": {
                        "type": "boolean",
                        "description": "Whether the search is case sensitive (default: false)",
                        "default": false
                    }
                },
                "required": ["name"]
            }),
        ),
        ToolDefinition::new(
            SEARCH_NODES,
            "Search nodes by string in any property",
            json!({
                "type": "object",
                "properties": {
                    "search_string": {
                        "type": "string",
                        "description": "String to search for in node properties"
                    },
                    "property_name": {
                        "type": "string",
                        "description": "Specific property to search in (optional, searches name, city and occupation if not specified)"
                    },
                    "case_sensitive": {
                        "type": "boolean",
                        "description": "Whether the search is case sensitive (default: false)",
                        "default": false
                    }
                },
                "required": ["search_string"]
            }),
        ),
        ToolDefinition::new(
            CREATE_ENTITIES,
            "Create memory entities (nodes) in the graph",
            json!({
                "type": "object",
                "properties": {
                    "entity_type": {
                        "type": "string",
                        "description": "Type/category of entity (e.g., 'Person', 'Place', 'Concept')"
                    },
                    "properties": {
                        "type": "object",
                        "description": "Properties of the entity (must include 'name' or 'id')"
                    },
                    "labels": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Additional labels for the entity (optional)"
                    }
                },
                "required": ["entity_type", "properties"]
            }),
        ),
        ToolDefinition::new(
            DELETE_ENTITIES,
            "Delete memory entities (nodes) from the graph",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Entity identifier (name, id, or internal Neo4j element ID)"
                    },
                    "entity_type": {
                        "type": "string",
                        "description": "Type/category of entity to filter by (optional)"
                    },
                    "delete_relationships": {
                        "type": "boolean",
                        "description": "Whether to also delete relationships (default: true)",
                        "default": true
                    }
                },
                "required": ["entity_id"]
            }),
        ),
        ToolDefinition::new(
            CREATE_RELATIONS,
            "Create relationships between entities",
            json!({
                "type": "object",
                "properties": {
                    "source_id": { "type": "string", "description": "Source entity identifier" },
                    "target_id": { "type": "string", "description": "Target entity identifier" },
                    "relationship_type": {
                        "type": "string",
                        "description": "Type of relationship (e.g., 'KNOWS', 'LIVES_IN', 'WORKS_FOR')"
                    },
                    "properties": {
                        "type": "object",
                        "description": "Properties of the relationship (optional)"
                    }
                },
                "required": ["source_id", "target_id", "relationship_type"]
            }),
        ),
        ToolDefinition::new(
            DELETE_RELATIONS,
            "Delete relationships between entities",
            json!({
                "type": "object",
                "properties": {
                    "source_id": { "type": "string", "description": "Source entity identifier" },
                    "target_id": { "type": "string", "description": "Target entity identifier" },
                    "relationship_type": {
                        "type": "string",
                        "description": "Specific relationship type to delete (optional, deletes all if not specified)"
                    }
                },
                "required": ["source_id", "target_id"]
            }),
        ),
        ToolDefinition::new(
            ADD_OBSERVATIONS,
            "Add observation statements to entities",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": { "type": "string", "description": "Target entity identifier" },
                    "observation_text": {
                        "type": "string",
                        "description": "The observation statement to add"
                    },
                    "timestamp": {
                        "type": "string",
                        "description": "Timestamp for the observation (optional, uses current time if not provided)"
                    },
                    "source": { "type": "string", "description": "Source of the observation (optional)" },
                    "confidence": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Confidence level of the observation (0.0 to 1.0, optional)"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags for categorizing the observation (optional)"
                    }
                },
                "required": ["entity_id", "observation_text"]
            }),
        ),
        ToolDefinition::new(
            DELETE_OBSERVATIONS,
            "Delete observation statements from entities",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": { "type": "string", "description": "Target entity identifier" },
                    "observation_id": {
                        "type": "string",
                        "description": "Specific observation element ID to delete (optional, deletes all if no filter is given)"
                    },
                    "observation_text": {
                        "type": "string",
                        "description": "Observation text to match for deletion (optional)"
                    },
                    "source": { "type": "string", "description": "Source filter for deletion (optional)" },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags filter for deletion (optional)"
                    }
                },
                "required": ["entity_id"]
            }),
        ),
        ToolDefinition::new(
            DISCONNECT_NEO4J,
            "Disconnect from the Neo4j database",
            no_arguments(),
        ),
        ToolDefinition::new(
            HEALTH_CHECK,
            "Return server health status including connection state, server version, \
             sanitized Neo4j URI, uptime and concurrency metrics.",
            no_arguments(),
        ),
        ToolDefinition::new(
            SHUTDOWN_SERVER,
            "Request graceful shutdown of the server (drains in-flight calls and closes the connection).",
            no_arguments(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_tool_count() {
        assert_eq!(get_tool_definitions().len(), 13);
    }

    #[test]
    fn test_required_arguments_follow_schema_order() {
        let tools = get_tool_definitions();
        let relations = tools.iter().find(|t| t.name == CREATE_RELATIONS).unwrap();
        assert_eq!(
            relations.required_arguments(),
            vec!["source_id", "target_id", "relationship_type"]
        );

        let health = tools.iter().find(|t| t.name == HEALTH_CHECK).unwrap();
        assert!(health.required_arguments().is_empty());
    }

    #[test]
    fn test_serializes_with_camel_case_schema_key() {
        let value = serde_json::to_value(&get_tool_definitions()[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert_eq!(value["name"], "connect_neo4j");
    }
}
