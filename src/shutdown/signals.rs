//! OS signal delivery into the [`StopSignal`]
//!
//! Two strategies, tried in order for each signal:
//! - [`RuntimeSignals`]: tokio's runtime-integrated listeners
//! - [`ProcessSignals`]: a `signal-hook` iterator on a dedicated thread
//!
//! A signal neither strategy can watch is skipped. With none installed the
//! server still shuts down through the `shutdown_server` tool.

use tracing::{debug, warn};

use super::StopSignal;
use crate::types::{McpError, Result};

/// Signals that request a graceful shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    #[cfg(windows)]
    CtrlBreak,
}

impl ShutdownSignal {
    pub fn name(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            #[cfg(windows)]
            ShutdownSignal::CtrlBreak => "SIGBREAK",
        }
    }

    /// Every signal this platform can ask for
    pub fn all() -> Vec<ShutdownSignal> {
        #[allow(unused_mut)]
        let mut signals = vec![ShutdownSignal::Interrupt, ShutdownSignal::Terminate];
        #[cfg(windows)]
        signals.push(ShutdownSignal::CtrlBreak);
        signals
    }
}

/// One way of routing an OS signal to the stop signal
pub trait SignalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn install(&self, signal: ShutdownSignal, stop: &StopSignal) -> Result<()>;
}

/// tokio signal listeners; needs a running runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeSignals;

impl SignalStrategy for RuntimeSignals {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn install(&self, signal: ShutdownSignal, stop: &StopSignal) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| McpError::Shutdown(format!("no async runtime: {}", e)))?;
        let _guard = handle.enter();
        listen(signal, stop.clone())
    }
}

#[cfg(unix)]
fn listen(signal: ShutdownSignal, stop: StopSignal) -> Result<()> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let kind = match signal {
        ShutdownSignal::Interrupt => SignalKind::interrupt(),
        ShutdownSignal::Terminate => SignalKind::terminate(),
    };
    let mut stream = unix_signal(kind)?;
    let name = signal.name();
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            stop.request_shutdown(name);
        }
    });
    Ok(())
}

#[cfg(windows)]
fn listen(signal: ShutdownSignal, stop: StopSignal) -> Result<()> {
    use tokio::signal::windows;

    let name = signal.name();
    match signal {
        ShutdownSignal::Interrupt => {
            let mut stream = windows::ctrl_c()?;
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    stop.request_shutdown(name);
                }
            });
        }
        ShutdownSignal::CtrlBreak => {
            let mut stream = windows::ctrl_break()?;
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    stop.request_shutdown(name);
                }
            });
        }
        ShutdownSignal::Terminate => {
            return Err(McpError::Shutdown(format!("{} is not delivered on Windows", name)));
        }
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn listen(signal: ShutdownSignal, _stop: StopSignal) -> Result<()> {
    Err(McpError::Shutdown(format!(
        "{} is not supported on this platform",
        signal.name()
    )))
}

/// `signal-hook` listener thread, independent of the async runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSignals;

impl SignalStrategy for ProcessSignals {
    fn name(&self) -> &'static str {
        "fallback"
    }

    #[cfg(unix)]
    fn install(&self, signal: ShutdownSignal, stop: &StopSignal) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let raw = match signal {
            ShutdownSignal::Interrupt => SIGINT,
            ShutdownSignal::Terminate => SIGTERM,
        };
        let mut signals = Signals::new([raw])?;
        let stop = stop.clone();
        let name = signal.name();
        std::thread::Builder::new()
            .name(format!("signal-{}", name.to_ascii_lowercase()))
            .spawn(move || {
                for _ in signals.forever() {
                    stop.request_shutdown(name);
                }
            })?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn install(&self, signal: ShutdownSignal, _stop: &StopSignal) -> Result<()> {
        Err(McpError::Shutdown(format!(
            "process-level handler for {} is not supported on this platform",
            signal.name()
        )))
    }
}

/// Install SIGINT/SIGTERM handlers, runtime strategy first.
///
/// Returns the registered signal names; fallbacks carry a `:fallback` suffix.
pub fn install_signal_handlers(stop: &StopSignal) -> Vec<String> {
    let strategies: [&dyn SignalStrategy; 2] = [&RuntimeSignals, &ProcessSignals];
    install_with(&strategies, stop)
}

pub fn install_with(strategies: &[&dyn SignalStrategy], stop: &StopSignal) -> Vec<String> {
    let mut registered = Vec::new();
    for signal in ShutdownSignal::all() {
        let mut installed = false;
        for (rank, strategy) in strategies.iter().enumerate() {
            match strategy.install(signal, stop) {
                Ok(()) => {
                    registered.push(if rank == 0 {
                        signal.name().to_string()
                    } else {
                        format!("{}:{}", signal.name(), strategy.name())
                    });
                    installed = true;
                    break;
                }
                Err(e) => debug!(
                    "{} handler for {} unavailable: {}",
                    strategy.name(),
                    signal.name(),
                    e
                ),
            }
        }
        if !installed {
            debug!("Could not register handler for signal {}", signal.name());
        }
    }

    if registered.is_empty() {
        warn!("No signal handlers registered (environment limitation)");
    } else {
        debug!("Registered signal handlers: {}", registered.join(", "));
    }
    registered
}
