//! Run-lifetime control: the run flag and the timeout monitor.
//!
//! The flag gates the main update loop. It starts set and can only be
//! cleared; nothing ever sets it back during a run. Writers are the timeout
//! monitor and the interrupt handler, the reader is the update loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Cancellation token for one run.
///
/// Cheap to clone; all clones share the same flag.
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    /// Creates a set flag.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the run should keep going.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Clears the flag. There is no way to set it again.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task that clears the run flag after a fixed duration.
///
/// Call [`TimeoutMonitor::stop`] when the run ends first to cancel the
/// pending timeout.
pub struct TimeoutMonitor {
    handle: Option<JoinHandle<()>>,
}

impl TimeoutMonitor {
    /// Start the monitor: after `timeout`, clear `flag` and log the expiry.
    pub fn start(flag: RunFlag, timeout: Duration) -> Self {
        info!(timeout_secs = timeout.as_secs(), "Timeout monitor started");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if flag.is_running() {
                info!(
                    timeout_secs = timeout.as_secs(),
                    "Timeout reached, stopping run"
                );
                flag.cancel();
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Cancel the pending timeout.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TimeoutMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Arm a background task that clears `flag` on ctrl-c.
pub fn cancel_on_interrupt(flag: RunFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping run");
            flag.cancel();
        }
    })
}
