//! Graceful shutdown
//!
//! One [`StopSignal`] per process. OS signal handlers and the
//! `shutdown_server` tool both arm it; the first arm wins and later ones
//! report that shutdown is already in progress.
//!
//! [`ShutdownCoordinator::run`] races the primary server loop against the
//! signal. If the signal wins, the loop is aborted and awaited. Either way
//! the in-flight tool calls are then drained and pending responses flushed.
//! Finally the shared connection is closed once and the coordinator returns.

pub mod signals;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::db::ConnectionManager;
use crate::types::Result;

pub use signals::{install_signal_handlers, ProcessSignals, RuntimeSignals, ShutdownSignal, SignalStrategy};

/// Outcome of arming the stop signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownRequest {
    Accepted,
    AlreadyInProgress,
}

/// Process-wide, set-once stop flag
#[derive(Clone)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

struct StopInner {
    armed: AtomicBool,
    notify: watch::Sender<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            inner: Arc::new(StopInner {
                armed: AtomicBool::new(false),
                notify,
            }),
        }
    }

    /// Arm the signal. Only the first caller gets `Accepted` and is logged.
    pub fn request_shutdown(&self, source: &str) -> ShutdownRequest {
        if self
            .inner
            .armed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Received {}. Initiating graceful shutdown...", source);
            self.inner.notify.send_replace(true);
            ShutdownRequest::Accepted
        } else {
            debug!(source, "Shutdown already in progress");
            ShutdownRequest::AlreadyInProgress
        }
    }

    pub fn is_set(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    /// Resolve once the signal is armed; immediately if it already is
    pub async fn wait(&self) {
        let mut rx = self.inner.notify.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|armed| *armed).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// What ended the primary server loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The loop returned on its own (input closed or fatal error)
    ServerCompleted,
    /// The stop signal fired first and the loop was cancelled
    StopSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    /// Tool calls still running when the drain started
    pub in_flight: usize,
    /// Every tracked in-flight call finished inside the drain window
    pub drained: bool,
}

pub struct ShutdownCoordinator {
    stop: StopSignal,
    connection: Arc<ConnectionManager>,
    drain_timeout: Duration,
    output: Option<TaskTracker>,
}

impl ShutdownCoordinator {
    pub fn new(stop: StopSignal, connection: Arc<ConnectionManager>, drain_timeout: Duration) -> Self {
        Self {
            stop,
            connection,
            drain_timeout,
            output: None,
        }
    }

    /// Also wait for the response writer once the calls have drained
    pub fn with_output(mut self, output: TaskTracker) -> Self {
        self.output = Some(output);
        self
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Run `server` until it finishes or the stop signal fires, then drain
    /// `tracker` (tool calls only) and close the connection.
    pub async fn run<F>(&self, server: F, tracker: TaskTracker) -> ShutdownReport
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut server_task = tokio::spawn(server);

        let trigger = tokio::select! {
            joined = &mut server_task => {
                match joined {
                    Ok(Ok(())) => debug!("Server loop finished"),
                    Ok(Err(e)) => error!("Unhandled server error: {}", e),
                    Err(e) => error!("Server task failed: {}", e),
                }
                ShutdownTrigger::ServerCompleted
            }
            _ = self.stop.wait() => {
                server_task.abort();
                match server_task.await {
                    Err(e) if e.is_cancelled() => debug!("Server task cancelled during shutdown."),
                    Err(e) => error!("Server task failed during shutdown: {}", e),
                    Ok(Err(e)) => error!("Unhandled server error: {}", e),
                    Ok(Ok(())) => debug!("Server loop finished before cancellation"),
                }
                ShutdownTrigger::StopSignal
            }
        };

        tracker.close();
        let in_flight = tracker.len();
        if in_flight > 0 {
            info!(in_flight, "Waiting for in-flight tool calls to finish");
        }
        let drained = tokio::time::timeout(self.drain_timeout, tracker.wait())
            .await
            .is_ok();
        if !drained {
            warn!(
                remaining = tracker.len(),
                "In-flight tool calls still running after {}s; closing anyway",
                self.drain_timeout.as_secs()
            );
        } else if let Some(output) = &self.output {
            output.close();
            if tokio::time::timeout(self.drain_timeout, output.wait()).await.is_err() {
                warn!("Response writer did not finish flushing");
            }
        }

        match self.connection.disconnect().await {
            Ok(message) => debug!("{}", message),
            Err(e) => warn!("Error during disconnect: {}", e),
        }
        info!("Server shutdown complete.");

        ShutdownReport {
            trigger,
            in_flight,
            drained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock::{creds, MockDriver, Probe};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_second_request_does_not_rearm() {
        let stop = StopSignal::new();
        assert!(!stop.is_set());
        assert_eq!(stop.request_shutdown("SIGTERM"), ShutdownRequest::Accepted);
        assert_eq!(stop.request_shutdown("shutdown_server"), ShutdownRequest::AlreadyInProgress);
        assert!(stop.is_set());
    }

    #[tokio::test]
    async fn test_wait_returns_when_already_armed() {
        let stop = StopSignal::new();
        stop.request_shutdown("test");
        tokio::time::timeout(Duration::from_millis(100), stop.wait())
            .await
            .expect("wait should resolve immediately");
    }

    #[tokio::test]
    async fn test_stop_signal_cancels_loop_and_drains() {
        let driver = MockDriver::new(Probe::Ok);
        let connection = Arc::new(ConnectionManager::new(driver.clone()));
        connection.connect(creds()).await.unwrap();

        let stop = StopSignal::new();
        let coordinator =
            ShutdownCoordinator::new(stop.clone(), Arc::clone(&connection), Duration::from_secs(5));
        let tracker = TaskTracker::new();

        let finished = Arc::new(AtomicUsize::new(0));
        {
            let finished = Arc::clone(&finished);
            tracker.spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        let trigger = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.request_shutdown("test");
        });

        let report = coordinator
            .run(std::future::pending::<Result<()>>(), tracker)
            .await;

        assert_eq!(report.trigger, ShutdownTrigger::StopSignal);
        assert!(report.drained);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(driver.closes(), 1);
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_writer_is_not_counted_as_in_flight_call() {
        let driver = MockDriver::new(Probe::Ok);
        let connection = Arc::new(ConnectionManager::new(driver));
        let calls = TaskTracker::new();
        let output = TaskTracker::new();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<usize>();
        let flushed = Arc::new(AtomicUsize::new(0));
        {
            let flushed = Arc::clone(&flushed);
            output.spawn(async move {
                while let Some(n) = rx.recv().await {
                    flushed.fetch_add(n, Ordering::SeqCst);
                }
            });
        }
        calls.spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = tx.send(1);
        });

        let coordinator =
            ShutdownCoordinator::new(StopSignal::new(), connection, Duration::from_secs(2))
                .with_output(output.clone());
        let report = coordinator.run(async { Ok(()) }, calls).await;

        assert_eq!(report.in_flight, 1);
        assert!(report.drained);
        assert!(output.is_empty());
        assert_eq!(flushed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_loop_still_closes_connection() {
        let driver = MockDriver::new(Probe::Ok);
        let connection = Arc::new(ConnectionManager::new(driver.clone()));
        connection.connect(creds()).await.unwrap();

        let coordinator =
            ShutdownCoordinator::new(StopSignal::new(), connection, Duration::from_secs(1));
        let report = coordinator.run(async { Ok(()) }, TaskTracker::new()).await;

        assert_eq!(report.trigger, ShutdownTrigger::ServerCompleted);
        assert_eq!(driver.closes(), 1);
    }

    #[tokio::test]
    async fn test_disconnected_shutdown_closes_nothing() {
        let driver = MockDriver::new(Probe::Ok);
        let connection = Arc::new(ConnectionManager::new(driver.clone()));
        let coordinator =
            ShutdownCoordinator::new(StopSignal::new(), connection, Duration::from_secs(1));

        coordinator.run(async { Ok(()) }, TaskTracker::new()).await;
        assert_eq!(driver.closes(), 0);
    }
}
