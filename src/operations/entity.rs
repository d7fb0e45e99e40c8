//! Entity (node) creation and deletion

use serde_json::{json, Value};

use crate::db::{Database, Params};
use crate::protocol::ToolResult;
use crate::tools::Arguments;
use crate::types::Result;

use super::match_entity;
use super::validators::{
    bool_arg, optional_str, required_str, string_list, validate_entity_properties,
    validate_identifier,
};

#[derive(Clone)]
pub struct EntityOperations {
    db: Database,
}

impl EntityOperations {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create one node labelled `entity_type` plus any extra `labels`
    pub async fn create_entities(&self, arguments: &Arguments) -> Result<ToolResult> {
        let entity_type = required_str(arguments, "entity_type")?;
        let properties = validate_entity_properties(arguments.get("properties").unwrap_or(&Value::Null))?;
        let labels = string_list(arguments, "labels")?;

        let mut all_labels = Vec::with_capacity(labels.len() + 1);
        all_labels.push(entity_type);
        all_labels.extend(labels);
        for label in &all_labels {
            validate_identifier("label", label)?;
        }

        let query = format!(
            "CREATE (n:{} $properties)\nRETURN n",
            all_labels.join(":")
        );
        let mut params = Params::new();
        params.insert("properties".to_string(), Value::Object(properties.clone()));
        self.db.run_query(&query, params).await
    }

    /// Delete a node matched by name, id or element id, optionally with its
    /// relationships
    pub async fn delete_entities(&self, arguments: &Arguments) -> Result<ToolResult> {
        let entity_id = required_str(arguments, "entity_id")?;
        let entity_type = optional_str(arguments, "entity_type")?;
        let delete_relationships = bool_arg(arguments, "delete_relationships", true)?;

        let pattern = match &entity_type {
            Some(label) => {
                validate_identifier("entity type", label)?;
                format!("(n:{})", label)
            }
            None => "(n)".to_string(),
        };
        let removal = if delete_relationships {
            "OPTIONAL MATCH (n)-[r]-()\nDELETE r, n"
        } else {
            "DELETE n"
        };
        let query = format!(
            "MATCH {}\nWHERE {}\n{}\nRETURN count(n) as deleted_count",
            pattern,
            match_entity("n", "entity_id"),
            removal
        );

        let mut params = Params::new();
        params.insert("entity_id".to_string(), json!(entity_id));
        self.db.run_query(&query, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{args, database, last};

    #[tokio::test]
    async fn test_create_joins_labels() {
        let (driver, db) = database();
        EntityOperations::new(db)
            .create_entities(&args(json!({
                "entity_type": "Person",
                "properties": { "name": "Alice", "age": 30 },
                "labels": ["Employee"]
            })))
            .await
            .unwrap();

        let (query, params) = last(&driver);
        assert_eq!(query, "CREATE (n:Person:Employee $properties) RETURN n");
        assert_eq!(params["properties"], json!({ "name": "Alice", "age": 30 }));
    }

    #[tokio::test]
    async fn test_create_requires_name_or_id() {
        let (driver, db) = database();
        let err = EntityOperations::new(db)
            .create_entities(&args(json!({ "entity_type": "Person", "properties": { "age": 3 } })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Name or id property is required");
        assert!(driver.last_query().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_unsafe_label() {
        let (_driver, db) = database();
        let err = EntityOperations::new(db)
            .create_entities(&args(json!({
                "entity_type": "Person) DETACH DELETE (m",
                "properties": { "name": "x" }
            })))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid label"));
    }

    #[tokio::test]
    async fn test_delete_with_relationships_by_default() {
        let (driver, db) = database();
        EntityOperations::new(db)
            .delete_entities(&args(json!({ "entity_id": "Alice" })))
            .await
            .unwrap();

        let (query, params) = last(&driver);
        assert_eq!(
            query,
            "MATCH (n) WHERE (n.name = $entity_id OR n.id = $entity_id OR elementId(n) = $entity_id) \
             OPTIONAL MATCH (n)-[r]-() DELETE r, n RETURN count(n) as deleted_count"
        );
        assert_eq!(params["entity_id"], json!("Alice"));
    }

    #[tokio::test]
    async fn test_delete_typed_node_only() {
        let (driver, db) = database();
        EntityOperations::new(db)
            .delete_entities(&args(json!({
                "entity_id": "42",
                "entity_type": "Person",
                "delete_relationships": false
            })))
            .await
            .unwrap();

        let (query, _) = last(&driver);
        assert!(query.starts_with("MATCH (n:Person) WHERE"));
        assert!(query.contains(") DELETE n RETURN"));
        assert!(!query.contains("OPTIONAL MATCH"));
    }
}
