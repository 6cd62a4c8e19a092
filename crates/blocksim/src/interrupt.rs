//! Cooperative early termination.
//!
//! The block loop polls a [`StopSignal`] between blocks. An OS signal
//! listener, when installed, runs on its own thread and sets the flag; it
//! reads [`Progress`] to report where the run was when the signal arrived.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::SimError;

/// Set-once stop request shared between the driver and the listener.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    reason: OnceLock<String>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Only the first reason is kept.
    pub fn trigger(&self, reason: impl Into<String>) {
        let _ = self.inner.reason.set(reason.into());
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns true once a stop was requested.
    pub fn is_triggered(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Reason given by the first [`StopSignal::trigger`] call.
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.get().cloned()
    }
}

/// Height and operation count published by the block loop.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    height: Arc<AtomicU64>,
    op_count: Arc<AtomicU64>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, height: u64, op_count: u64) {
        self.height.store(height, Ordering::Relaxed);
        self.op_count.store(op_count, Ordering::Relaxed);
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::Relaxed)
    }

    pub fn op_count(&self) -> u64 {
        self.op_count.load(Ordering::Relaxed)
    }

    /// Stop reason naming the signal and the current position.
    pub fn describe(&self, signal: &str) -> String {
        format!(
            "Exiting early due to {signal}, on block {}, operation {}",
            self.height(),
            self.op_count()
        )
    }
}

// ============================================================================
// OS Signal Listener
// ============================================================================

/// Background listener turning SIGTERM, SIGQUIT and SIGINT into a stop request.
///
/// Dropping the listener closes the signal iterator and joins its thread.
#[cfg(unix)]
pub struct SignalListener {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl SignalListener {
    /// Installs the listener.
    pub fn install(stop: StopSignal, progress: Progress) -> Result<Self, SimError> {
        use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGTERM, SIGQUIT, SIGINT])
            .map_err(|e| SimError::Signal(e.to_string()))?;
        let handle = signals.handle();

        let thread = std::thread::Builder::new()
            .name("blocksim-signals".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    let name = match signal {
                        SIGTERM => "SIGTERM",
                        SIGQUIT => "SIGQUIT",
                        SIGINT => "SIGINT",
                        _ => "signal",
                    };
                    let reason = progress.describe(name);
                    tracing::warn!(
                        signal = name,
                        height = progress.height(),
                        op_count = progress.op_count(),
                        "received stop signal"
                    );
                    stop.trigger(reason);
                }
            })
            .map_err(|e| SimError::Signal(e.to_string()))?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for SignalListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Ctrl-C listener.
///
/// `ctrlc` installs a process-wide handler that cannot be removed, so it is
/// installed once and forwards to whichever run is current.
#[cfg(windows)]
#[derive(Debug)]
pub struct SignalListener {
    _private: (),
}

#[cfg(windows)]
static CURRENT: std::sync::Mutex<Option<(StopSignal, Progress)>> = std::sync::Mutex::new(None);

#[cfg(windows)]
impl SignalListener {
    /// Installs the listener.
    pub fn install(stop: StopSignal, progress: Progress) -> Result<Self, SimError> {
        static INSTALLED: OnceLock<Result<(), String>> = OnceLock::new();

        *CURRENT
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some((stop, progress));

        INSTALLED
            .get_or_init(|| {
                ctrlc::set_handler(|| {
                    let current = CURRENT
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    if let Some((stop, progress)) = current.as_ref() {
                        tracing::warn!(signal = "Ctrl-C", "received stop signal");
                        stop.trigger(progress.describe("Ctrl-C"));
                    }
                })
                .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(SimError::Signal)?;

        Ok(Self { _private: () })
    }
}

#[cfg(windows)]
impl Drop for SignalListener {
    fn drop(&mut self) {
        *CURRENT
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}
