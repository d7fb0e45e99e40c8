//! Relationships between entities

use serde_json::json;

use crate::db::{Database, Params};
use crate::protocol::ToolResult;
use crate::tools::Arguments;
use crate::types::Result;

use super::match_entity;
use super::validators::{object_arg, optional_str, required_str, validate_identifier};

/// Relationship properties travel as `$prop_<key>` so they cannot collide
/// with the endpoint parameters.
const PROPERTY_PARAM_PREFIX: &str = "prop_";

#[derive(Clone)]
pub struct RelationshipOperations {
    db: Database,
}

impl RelationshipOperations {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_relations(&self, arguments: &Arguments) -> Result<ToolResult> {
        let source_id = required_str(arguments, "source_id")?;
        let target_id = required_str(arguments, "target_id")?;
        let relationship_type = required_str(arguments, "relationship_type")?;
        let properties = object_arg(arguments, "properties")?;
        validate_identifier("relationship type", &relationship_type)?;

        let mut params = Params::new();
        params.insert("source_id".to_string(), json!(source_id));
        params.insert("target_id".to_string(), json!(target_id));

        let mut assignments = Vec::with_capacity(properties.len());
        for (key, value) in properties {
            validate_identifier("property name", &key)?;
            let param = format!("{}{}", PROPERTY_PARAM_PREFIX, key);
            assignments.push(format!("{}: ${}", key, param));
            params.insert(param, value);
        }
        let rel = if assignments.is_empty() {
            format!("[r:{}]", relationship_type)
        } else {
            format!("[r:{} {{{}}}]", relationship_type, assignments.join(", "))
        };

        let query = format!(
            "MATCH (source), (target)\nWHERE {}\nAND {}\nCREATE (source)-{}->(target)\nRETURN r",
            match_entity("source", "source_id"),
            match_entity("target", "target_id"),
            rel
        );
        self.db.run_query(&query, params).await
    }

    /// Delete relationships from source to target, all types unless one
    /// is named
    pub async fn delete_relations(&self, arguments: &Arguments) -> Result<ToolResult> {
        let source_id = required_str(arguments, "source_id")?;
        let target_id = required_str(arguments, "target_id")?;
        let relationship_type = optional_str(arguments, "relationship_type")?;

        let rel = match relationship_type {
            Some(kind) => {
                validate_identifier("relationship type", &kind)?;
                format!("[r:{}]", kind)
            }
            None => "[r]".to_string(),
        };
        let query = format!(
            "MATCH (source)-{}->(target)\nWHERE {}\nAND {}\nDELETE r\nRETURN count(r) as deleted_count",
            rel,
            match_entity("source", "source_id"),
            match_entity("target", "target_id"),
        );

        let mut params = Params::new();
        params.insert("source_id".to_string(), json!(source_id));
        params.insert("target_id".to_string(), json!(target_id));
        self.db.run_query(&query, params).await
    }
}
