//! Connection lifecycle for the single shared Neo4j handle
//!
//! [`ConnectionManager`] is the only owner of the handle. Two locks guard it:
//! - `connecting` serializes connect attempts (explicit, forced and lazy) and
//!   is held across the driver's open and verification I/O
//! - `state` guards the in-memory state and is never held across driver I/O
//!
//! An attempt opens and verifies into locals and commits only after its I/O
//! finishes, so a cancelled lazy auto-connect leaves its credentials pending.
//! `disconnect` only needs `state`. It bumps an epoch, and an attempt that
//! started under an older epoch closes its own handle instead of committing.
//!
//! A read-only [`ConnectionStatus`] snapshot is published on a watch channel
//! after each transition. Reading it never waits on an in-flight connect.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::driver::{Credentials, GraphConnection, GraphDriver, Params};
use crate::types::{McpError, Result};

pub const MSG_ALREADY_CONNECTED: &str =
    "Already connected; skipping reconnect (use force=true to reconnect).";
pub const MSG_DISCONNECTED: &str = "Successfully disconnected from Neo4j";
pub const MSG_NOT_CONNECTED: &str = "Not connected to Neo4j";
pub const MSG_SUPERSEDED: &str = "Connection attempt superseded by disconnect";

const LIVENESS_QUERY: &str = "RETURN 1 AS test";

/// Where the shared connection currently stands
enum ConnectionState {
    Disconnected,
    /// Credentials known, connection not opened yet
    PendingAutoConnect(Credentials),
    Connected(LiveConnection),
}

struct LiveConnection {
    handle: Arc<dyn GraphConnection>,
    credentials: Credentials,
}

struct Shared {
    current: ConnectionState,
    /// Bumped by every disconnect
    epoch: u64,
}

/// What an attempt should do when it cannot commit a new handle
#[derive(Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// Explicit connect: failure leaves the manager disconnected
    Explicit,
    /// Lazy auto-connect: failure keeps the credentials pending
    Lazy,
}

enum Lookup {
    Live(Arc<dyn GraphConnection>),
    Pending(Credentials),
}

/// Point-in-time view of the connection, safe to surface to clients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub pending: bool,
    /// Last known endpoint with any `principal:secret@` segment removed
    pub endpoint: Option<String>,
}

pub struct ConnectionManager {
    driver: Arc<dyn GraphDriver>,
    connecting: Mutex<()>,
    state: Mutex<Shared>,
    status: watch::Sender<ConnectionStatus>,
}

impl ConnectionManager {
    /// Start disconnected with no stored credentials
    pub fn new(driver: Arc<dyn GraphDriver>) -> Self {
        Self::with_credentials(driver, None)
    }

    /// Start pending when credentials are supplied, disconnected otherwise.
    /// The environment is not consulted.
    pub fn with_credentials(driver: Arc<dyn GraphDriver>, credentials: Option<Credentials>) -> Self {
        let current = match credentials {
            Some(credentials) => ConnectionState::PendingAutoConnect(credentials),
            None => ConnectionState::Disconnected,
        };
        let (status, _) = watch::channel(snapshot(&current, None));
        Self {
            driver,
            connecting: Mutex::new(()),
            state: Mutex::new(Shared { current, epoch: 0 }),
            status,
        }
    }

    /// Store credentials for a later auto-connect.
    ///
    /// Incomplete explicit credentials fall back to `NEO4J_URI`,
    /// `NEO4J_USERNAME` and `NEO4J_PASSWORD`. A live connection is left alone.
    pub async fn configure(&self, explicit: Option<Credentials>) {
        let resolved = match explicit {
            Some(credentials) => {
                info!("Neo4j connection parameters provided; auto-connect pending");
                Some(credentials)
            }
            None => {
                let from_env = Credentials::from_env();
                if from_env.is_some() {
                    info!("Environment variables found for Neo4j connection; auto-connect pending");
                }
                from_env
            }
        };

        let mut shared = self.state.lock().await;
        if let ConnectionState::Connected(_) = &shared.current {
            debug!("Already connected; ignoring new connection parameters");
            return;
        }
        match resolved {
            Some(credentials) => shared.current = ConnectionState::PendingAutoConnect(credentials),
            None => info!(
                "No Neo4j connection parameters or environment variables found. Manual connection required."
            ),
        }
        self.publish(&shared.current);
    }

    /// Open a fresh verified connection, replacing any existing one.
    ///
    /// On failure the new handle is closed and the state is `Disconnected`.
    pub async fn connect(&self, credentials: Credentials) -> Result<String> {
        let _attempt = self.connecting.lock().await;
        self.replace_with(credentials).await
    }

    /// Handle to the live connection, auto-connecting from pending
    /// credentials at most once.
    pub async fn ensure_connected(&self) -> Result<Arc<dyn GraphConnection>> {
        if let Lookup::Live(handle) = self.lookup().await? {
            return Ok(handle);
        }

        let _attempt = self.connecting.lock().await;
        // Another caller may have connected while this one waited.
        match self.lookup().await? {
            Lookup::Live(handle) => Ok(handle),
            Lookup::Pending(credentials) => {
                info!("Auto-connecting to Neo4j using stored parameters...");
                self.attempt(credentials, Attempt::Lazy).await
            }
        }
    }

    /// Close the live connection. Closing nothing is a successful no-op.
    ///
    /// Never waits for an in-flight connect; that attempt is discarded
    /// when it finishes.
    pub async fn disconnect(&self) -> Result<String> {
        let live = {
            let mut shared = self.state.lock().await;
            shared.epoch += 1;
            match std::mem::replace(&mut shared.current, ConnectionState::Disconnected) {
                ConnectionState::Connected(live) => {
                    self.publish(&shared.current);
                    live
                }
                other => {
                    shared.current = other;
                    return Ok(MSG_NOT_CONNECTED.to_string());
                }
            }
        };

        match live.handle.close().await {
            Ok(()) => {
                info!(endpoint = %live.credentials.sanitized_endpoint(), "Disconnected from Neo4j");
                Ok(MSG_DISCONNECTED.to_string())
            }
            Err(e) => {
                warn!("Error disconnecting from Neo4j: {}", e);
                Err(McpError::Operation(format!("Error disconnecting from Neo4j: {}", e)))
            }
        }
    }

    /// Connect unless already connected; `force` closes the live connection
    /// first and opens a new one.
    pub async fn reconnect(&self, credentials: Credentials, force: bool) -> Result<String> {
        let _attempt = self.connecting.lock().await;
        if self.is_connected() {
            if !force {
                return Ok(MSG_ALREADY_CONNECTED.to_string());
            }
            info!("Forced reconnect requested");
        }
        self.replace_with(credentials).await
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().connected
    }

    async fn lookup(&self) -> Result<Lookup> {
        let shared = self.state.lock().await;
        match &shared.current {
            ConnectionState::Connected(live) => Ok(Lookup::Live(Arc::clone(&live.handle))),
            ConnectionState::PendingAutoConnect(credentials) => {
                Ok(Lookup::Pending(credentials.clone()))
            }
            ConnectionState::Disconnected => Err(McpError::NotConnected),
        }
    }

    /// Close any live handle, then open a new one. Caller holds `connecting`.
    async fn replace_with(&self, credentials: Credentials) -> Result<String> {
        let previous = {
            let mut shared = self.state.lock().await;
            match std::mem::replace(&mut shared.current, ConnectionState::Disconnected) {
                ConnectionState::Connected(live) => {
                    self.publish(&shared.current);
                    Some(live)
                }
                other => {
                    shared.current = other;
                    None
                }
            }
        };
        if let Some(old) = previous {
            if let Err(e) = old.handle.close().await {
                warn!("Error closing previous Neo4j connection: {}", e);
            }
        }

        let endpoint = credentials.sanitized_endpoint();
        self.attempt(credentials, Attempt::Explicit).await?;
        Ok(format!("Successfully connected to Neo4j at {}", endpoint))
    }

    /// Open and verify outside the state lock, then commit. Caller holds
    /// `connecting`.
    async fn attempt(
        &self,
        credentials: Credentials,
        kind: Attempt,
    ) -> Result<Arc<dyn GraphConnection>> {
        let epoch = self.state.lock().await.epoch;
        let outcome = self.open_verified(&credentials).await;

        let mut shared = self.state.lock().await;
        if shared.epoch != epoch {
            drop(shared);
            info!("Discarding connection attempt after disconnect");
            if let Ok(handle) = outcome {
                if let Err(e) = handle.close().await {
                    debug!("Error closing discarded connection: {}", e);
                }
            }
            return Err(McpError::Connect(MSG_SUPERSEDED.to_string()));
        }

        match outcome {
            Ok(handle) => {
                info!(
                    endpoint = %credentials.sanitized_endpoint(),
                    "Successfully established Neo4j connection"
                );
                shared.current = ConnectionState::Connected(LiveConnection {
                    handle: Arc::clone(&handle),
                    credentials,
                });
                self.publish(&shared.current);
                Ok(handle)
            }
            Err(e) => {
                error!("{}", e);
                if kind == Attempt::Explicit {
                    shared.current = ConnectionState::Disconnected;
                }
                self.publish(&shared.current);
                Err(e)
            }
        }
    }

    async fn open_verified(&self, credentials: &Credentials) -> Result<Arc<dyn GraphConnection>> {
        let handle = self
            .driver
            .open(credentials)
            .await
            .map_err(|e| McpError::Connect(e.to_string()))?;

        if let Err(e) = verify(handle.as_ref()).await {
            if let Err(close_err) = handle.close().await {
                debug!("Error closing unverified connection: {}", close_err);
            }
            return Err(e);
        }
        Ok(handle)
    }

    fn publish(&self, state: &ConnectionState) {
        let previous = self.status.borrow().endpoint.clone();
        self.status.send_replace(snapshot(state, previous));
    }
}

/// Status for `state`; `Disconnected` keeps the last known endpoint
fn snapshot(state: &ConnectionState, previous: Option<String>) -> ConnectionStatus {
    match state {
        ConnectionState::Disconnected => ConnectionStatus {
            connected: false,
            pending: false,
            endpoint: previous,
        },
        ConnectionState::PendingAutoConnect(credentials) => ConnectionStatus {
            connected: false,
            pending: true,
            endpoint: Some(credentials.sanitized_endpoint()),
        },
        ConnectionState::Connected(live) => ConnectionStatus {
            connected: true,
            pending: false,
            endpoint: Some(live.credentials.sanitized_endpoint()),
        },
    }
}

/// Liveness check: dedicated probe first, then a trivial round-trip query
async fn verify(handle: &dyn GraphConnection) -> Result<()> {
    match handle.verify_connectivity().await {
        Some(Ok(())) => return Ok(()),
        Some(Err(e)) => debug!(
            "Connectivity probe failed ({}), falling back to test query",
            e
        ),
        None => {}
    }

    let rows = handle
        .run(LIVENESS_QUERY, Params::new())
        .await
        .map_err(|e| McpError::Connect(format!("Connectivity verification failed: {}", e)))?;

    match rows.first().and_then(|row| row.get("test")).and_then(Value::as_i64) {
        Some(1) => Ok(()),
        _ => Err(McpError::Connect(
            "Connectivity verification failed: Connection test failed".to_string(),
        )),
    }
}
