//! Free-form Cypher

use crate::db::Database;
use crate::protocol::ToolResult;
use crate::tools::Arguments;
use crate::types::Result;

use super::validators::{object_arg, required_str};

#[derive(Clone)]
pub struct QueryOperations {
    db: Database,
}

impl QueryOperations {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// `query` with optional `parameters` object
    pub async fn run_cypher_query(&self, arguments: &Arguments) -> Result<ToolResult> {
        let query = required_str(arguments, "query")?;
        let parameters = object_arg(arguments, "parameters")?;
        self.db.run_query(&query, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{args, database, last};
    use serde_json::json;

    #[tokio::test]
    async fn test_passes_query_and_parameters_through() {
        let (driver, db) = database();
        let ops = QueryOperations::new(db);

        ops.run_cypher_query(&args(json!({
            "query": "MATCH (n {name: $name}) RETURN n",
            "parameters": { "name": "Alice" }
        })))
        .await
        .unwrap();

        let (query, params) = last(&driver);
        assert_eq!(query, "MATCH (n {name: $name}) RETURN n");
        assert_eq!(params.get("name"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn test_rejects_non_object_parameters() {
        let (_driver, db) = database();
        let ops = QueryOperations::new(db);

        let err = ops
            .run_cypher_query(&args(json!({ "query": "RETURN 1", "parameters": [1] })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Argument 'parameters' must be an object");
    }
}
