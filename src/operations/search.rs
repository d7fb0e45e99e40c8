//! Node lookup by name or by property text

use serde_json::json;

use crate::db::{Database, Params};
use crate::protocol::ToolResult;
use crate::tools::Arguments;
use crate::types::Result;

use super::validators::{bool_arg, optional_str, required_str, validate_identifier};

const RESULT_LIMIT: usize = 100;

/// Properties searched when the caller names none
const DEFAULT_SEARCH_PROPERTIES: [&str; 3] = ["name", "city", "occupation"];

#[derive(Clone)]
pub struct SearchOperations {
    db: Database,
}

impl SearchOperations {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Nodes whose `name` equals or contains `name`
    pub async fn find_nodes(&self, arguments: &Arguments) -> Result<ToolResult> {
        let name = required_str(arguments, "name")?;
        let exact_match = bool_arg(arguments, "exact_match", false)?;
        let case_sensitive = bool_arg(arguments, "case_sensitive", false)?;

        let predicate = text_predicate("n.name", "$name", exact_match, case_sensitive);
        let query = format!(
            "MATCH (n)\nWHERE {}\nRETURN n\nLIMIT {}",
            predicate, RESULT_LIMIT
        );

        let mut params = Params::new();
        params.insert("name".to_string(), json!(name));
        self.db.run_query(&query, params).await
    }

    /// Nodes with `search_string` inside one named property, or inside any
    /// of `name`, `city` and `occupation`
    pub async fn search_nodes(&self, arguments: &Arguments) -> Result<ToolResult> {
        let search_string = required_str(arguments, "search_string")?;
        let property_name = optional_str(arguments, "property_name")?;
        let case_sensitive = bool_arg(arguments, "case_sensitive", false)?;

        let predicate = match property_name {
            Some(property) => {
                validate_identifier("property name", &property)?;
                text_predicate(&format!("n.{}", property), "$search_string", false, case_sensitive)
            }
            None => DEFAULT_SEARCH_PROPERTIES
                .iter()
                .map(|p| {
                    format!(
                        "({})",
                        text_predicate(&format!("n.{}", p), "$search_string", false, case_sensitive)
                    )
                })
                .collect::<Vec<_>>()
                .join(" OR "),
        };
        let query = format!(
            "MATCH (n)\nWHERE {}\nRETURN n\nLIMIT {}",
            predicate, RESULT_LIMIT
        );

        let mut params = Params::new();
        params.insert("search_string".to_string(), json!(search_string));
        self.db.run_query(&query, params).await
    }
}

fn text_predicate(field: &str, param: &str, exact: bool, case_sensitive: bool) -> String {
    let op = if exact { "=" } else { "CONTAINS" };
    if case_sensitive {
        format!("{} {} {}", field, op, param)
    } else {
        format!("toLower({}) {} toLower({})", field, op, param)
    }
}
