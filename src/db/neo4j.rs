//! Production driver over the `neo4rs` Bolt client

use async_trait::async_trait;
use neo4rs::{
    query, BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    Graph,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::driver::{Credentials, GraphConnection, GraphDriver, Params, Record};
use crate::types::{McpError, Result};

/// Opens [`Neo4jConnection`]s with `Graph::new`
#[derive(Debug, Default, Clone, Copy)]
pub struct Neo4jDriver;

impl Neo4jDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GraphDriver for Neo4jDriver {
    async fn open(&self, credentials: &Credentials) -> Result<Arc<dyn GraphConnection>> {
        debug!(endpoint = %credentials.sanitized_endpoint(), "Opening Bolt connection");
        let graph = Graph::new(
            credentials.endpoint(),
            credentials.principal(),
            credentials.secret(),
        )
        .await
        .map_err(|e| McpError::Driver(e.to_string()))?;
        Ok(Arc::new(Neo4jConnection {
            graph: RwLock::new(Some(graph)),
        }))
    }
}

/// Live `neo4rs` graph handle. `close` drops the underlying pool.
pub struct Neo4jConnection {
    graph: RwLock<Option<Graph>>,
}

#[async_trait]
impl GraphConnection for Neo4jConnection {
    // neo4rs has no dedicated probe; the caller's round-trip query covers it.

    async fn run(&self, cypher: &str, params: Params) -> Result<Vec<Record>> {
        let graph = match self.graph.read().await.as_ref() {
            Some(graph) => graph.clone(),
            None => return Err(McpError::Driver("connection is closed".to_string())),
        };

        let mut q = query(cypher);
        for (key, value) in params {
            q = q.param(&key, json_to_bolt(value));
        }

        let mut stream = graph
            .execute(q)
            .await
            .map_err(|e| McpError::Driver(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| McpError::Driver(e.to_string()))?
        {
            let record: Record = row
                .to()
                .map_err(|e| McpError::Driver(format!("failed to decode row: {}", e)))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn close(&self) -> Result<()> {
        if self.graph.write().await.take().is_some() {
            debug!("Bolt connection pool released");
        }
        Ok(())
    }
}

/// Convert a JSON parameter into the Bolt value neo4rs sends on the wire
pub fn json_to_bolt(value: Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => BoltType::String(BoltString::new(&s)),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => {
            let mut bolt = BoltMap::new();
            for (k, v) in map {
                bolt.put(BoltString::new(&k), json_to_bolt(v));
            }
            BoltType::Map(bolt)
        }
    }
}
