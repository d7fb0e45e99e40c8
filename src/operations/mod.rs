//! Graph operations behind the MCP tools
//!
//! Each operation reads its validated arguments, builds a parameterized
//! Cypher statement and hands it to [`Database::run_query`], which owns
//! connecting, gating and the per-query deadline.
//!
//! [`Database::run_query`]: crate::db::Database::run_query

pub mod entity;
pub mod observation;
pub mod query;
pub mod relationship;
pub mod search;
pub mod validators;

pub use entity::EntityOperations;
pub use observation::ObservationOperations;
pub use query::QueryOperations;
pub use relationship::RelationshipOperations;
pub use search::SearchOperations;

/// `WHERE` predicate matching `var` by `name`, `id` or element id against
/// the `$param` parameter
pub(crate) fn match_entity(var: &str, param: &str) -> String {
    format!(
        "({v}.name = ${p} OR {v}.id = ${p} OR elementId({v}) = ${p})",
        v = var,
        p = param
    )
}
