//! Tool names as constants for dispatch matching.

// ========== CONNECTION ==========

pub const CONNECT_NEO4J: &str = "connect_neo4j";
pub const DISCONNECT_NEO4J: &str = "disconnect_neo4j";

// ========== QUERY & SEARCH ==========

pub const RUN_CYPHER_QUERY: &str = "run_cypher_query";
pub const FIND_NODES: &str = "find_nodes";
pub const SEARCH_NODES: &str = "search_nodes";

// ========== GRAPH WRITES ==========

pub const CREATE_ENTITIES: &str = "create_entities";
pub const DELETE_ENTITIES: &str = "delete_entities";
pub const CREATE_RELATIONS: &str = "create_relations";
pub const DELETE_RELATIONS: &str = "delete_relations";
pub const ADD_OBSERVATIONS: &str = "add_observations";
pub const DELETE_OBSERVATIONS: &str = "delete_observations";

// ========== SERVER ==========

/// Exempt from the per-call deadline
pub const HEALTH_CHECK: &str = "health_check";
/// Arms the process stop signal
pub const SHUTDOWN_SERVER: &str = "shutdown_server";
