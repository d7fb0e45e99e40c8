//! Database layer
//!
//! - [`driver`]: backend seam and credentials
//! - [`connection`]: lifecycle of the single shared connection
//! - [`gate`]: bounded admission to that connection
//! - [`operations`]: guarded query execution used by every graph tool
//! - [`neo4j`]: the `neo4rs` implementation of the driver seam

pub mod connection;
pub mod driver;
pub mod gate;
pub mod neo4j;
pub mod operations;

#[cfg(test)]
pub(crate) mod mock;

pub use connection::{ConnectionManager, ConnectionStatus};
pub use driver::{sanitize_endpoint, Credentials, GraphConnection, GraphDriver, Params, Record};
pub use gate::{ConcurrencyGate, ConcurrencyMetrics, GatePermit};
pub use neo4j::Neo4jDriver;
pub use operations::Database;
