//! Observations attached to entities via `HAS_OBSERVATION`

use chrono::Utc;
use serde_json::{json, Value};

use crate::db::{Database, Params};
use crate::protocol::ToolResult;
use crate::tools::Arguments;
use crate::types::Result;

use super::match_entity;
use super::validators::{optional_str, required_str, string_list, validate_confidence};

#[derive(Clone)]
pub struct ObservationOperations {
    db: Database,
}

impl ObservationOperations {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Attach one observation node to an entity
    pub async fn add_observations(&self, arguments: &Arguments) -> Result<ToolResult> {
        let entity_id = required_str(arguments, "entity_id")?;
        let observation_text = required_str(arguments, "observation_text")?;
        let timestamp = optional_str(arguments, "timestamp")?
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        let source = optional_str(arguments, "source")?;
        let confidence = validate_confidence(arguments.get("confidence"))?;
        let tags = string_list(arguments, "tags")?;

        let query = format!(
            "MATCH (entity)\n\
             WHERE {}\n\
             CREATE (entity)-[r:HAS_OBSERVATION]->(obs:Observation {{\n\
             text: $observation_text,\n\
             timestamp: $timestamp,\n\
             source: $source,\n\
             confidence: $confidence,\n\
             tags: $tags\n\
             }})\n\
             RETURN obs",
            match_entity("entity", "entity_id")
        );

        let mut params = Params::new();
        params.insert("entity_id".to_string(), json!(entity_id));
        params.insert("observation_text".to_string(), json!(observation_text));
        params.insert("timestamp".to_string(), json!(timestamp));
        params.insert("source".to_string(), json!(source));
        params.insert("confidence".to_string(), json!(confidence));
        params.insert("tags".to_string(), json!(tags));
        self.db.run_query(&query, params).await
    }

    /// Delete an entity's observations. The first filter present wins:
    /// `observation_id`, `observation_text`, `source`, then `tags`. With no
    /// filter every observation of the entity goes.
    pub async fn delete_observations(&self, arguments: &Arguments) -> Result<ToolResult> {
        let entity_id = required_str(arguments, "entity_id")?;
        let mut params = Params::new();
        params.insert("entity_id".to_string(), json!(entity_id));

        let filter = if let Some(id) = optional_str(arguments, "observation_id")? {
            params.insert("observation_id".to_string(), json!(id));
            Some("elementId(obs) = $observation_id")
        } else if let Some(text) = optional_str(arguments, "observation_text")? {
            params.insert("observation_text".to_string(), json!(text));
            Some("obs.text CONTAINS $observation_text")
        } else if let Some(source) = optional_str(arguments, "source")? {
            params.insert("source".to_string(), json!(source));
            Some("obs.source = $source")
        } else {
            let tags = string_list(arguments, "tags")?;
            if tags.is_empty() {
                None
            } else {
                params.insert(
                    "tags".to_string(),
                    Value::Array(tags.into_iter().map(Value::String).collect()),
                );
                Some("ANY(tag IN $tags WHERE tag IN obs.tags)")
            }
        };

        let mut query = format!(
            "MATCH (entity)-[r:HAS_OBSERVATION]->(obs:Observation)\nWHERE {}",
            match_entity("entity", "entity_id")
        );
        if let Some(filter) = filter {
            query.push_str("\nAND ");
            query.push_str(filter);
        }
        query.push_str("\nDELETE r, obs\nRETURN count(obs) as deleted_count");
        self.db.run_query(&query, params).await
    }
}
