//! Admission control for the shared connection
//!
//! A counting semaphore bounds how many queries run against the connection
//! at once. Slots are held by an owned [`GatePermit`] and returned on drop,
//! so a cancelled or timed-out caller still gives its slot back exactly once.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, warn};

use crate::types::{McpError, Result};

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Snapshot of gate utilization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConcurrencyMetrics {
    pub max_concurrency: usize,
    pub available_slots: usize,
    pub active_operations: usize,
    pub default_query_timeout_seconds: u64,
}

pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    query_timeout: Duration,
}

/// One occupied slot; released when dropped
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Missing or non-positive capacities fall back to
    /// [`DEFAULT_MAX_CONCURRENCY`].
    pub fn new(capacity: Option<i64>, query_timeout: Duration) -> Self {
        let capacity = match capacity {
            Some(n) if n > 0 => n as usize,
            Some(n) => {
                warn!(
                    "Invalid max concurrency {}, using default {}",
                    n, DEFAULT_MAX_CONCURRENCY
                );
                DEFAULT_MAX_CONCURRENCY
            }
            None => DEFAULT_MAX_CONCURRENCY,
        };
        debug!(capacity, timeout_secs = query_timeout.as_secs(), "Concurrency gate ready");
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            query_timeout,
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| McpError::Shutdown("concurrency gate closed".to_string()))?;
        Ok(GatePermit { _permit: permit })
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Some(GatePermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Non-blocking, read-only view of current utilization
    pub fn metrics(&self) -> ConcurrencyMetrics {
        let available = self.semaphore.available_permits().min(self.capacity);
        ConcurrencyMetrics {
            max_concurrency: self.capacity,
            available_slots: available,
            active_operations: self.capacity - available,
            default_query_timeout_seconds: self.query_timeout.as_secs(),
        }
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(None, DEFAULT_QUERY_TIMEOUT)
    }
}
