/// Statistics tracking for the callback registry
use serde::{Deserialize, Serialize};

/// Registry counters for monitoring
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CallbackStats {
    /// Handlers currently registered across all kinds
    pub total_handlers: usize,
    /// Events emitted since the registry was created
    pub events_emitted: u64,
    /// Handler invocations that returned an error
    pub handler_failures: u64,
}
