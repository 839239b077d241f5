/// Statistics tracking for the update driver
use serde::{Deserialize, Serialize};

/// Counters accumulated across ticks
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverStats {
    pub fixed_updates: u64,
    pub late_updates: u64,
    /// Inbound batches handed to the peer
    pub batches_dispatched: u64,
    /// Dispatch passes that stopped at `max_dispatch_per_tick`
    pub capped_dispatches: u64,
    pub state_sync_passes: u64,
    pub state_sync_failures: u64,
    /// Late updates in which the send timer (or a send request) fired
    pub send_firings: u64,
    pub datagrams_sent: u64,
    /// Passes skipped because no peer was attached
    pub skipped_passes: u64,
}
