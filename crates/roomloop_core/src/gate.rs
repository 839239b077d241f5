//! Shared flags that other subsystems use to steer the update driver.
//!
//! Both flags are cheap to clone handles around an atomic, so the RPC layer,
//! scene loading code or the host application can hold one without borrowing
//! the driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Gate that pauses all dispatching and sending while closed.
///
/// Typically closed while a new scene loads so that incoming state does not
/// reach objects that are about to be destroyed.
#[derive(Debug, Clone)]
pub struct MessageQueueGate {
    running: Arc<AtomicBool>,
}

impl MessageQueueGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns true while messages may be dispatched and sent.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Opens or closes the gate.
    pub fn set_running(&self, running: bool) {
        let previous = self.running.swap(running, Ordering::AcqRel);
        if previous != running {
            info!(
                "🚦 Message queue {}",
                if running { "resumed" } else { "paused" }
            );
        }
    }
}

impl Default for MessageQueueGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Request to flush outgoing commands on the next late update, regardless of
/// the send interval.
#[derive(Debug, Clone, Default)]
pub struct SendSignal {
    pending: Arc<AtomicBool>,
}

impl SendSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the driver to send as soon as possible.
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns true if a send has been requested and not yet served.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Clears the request, returning whether one was pending.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
