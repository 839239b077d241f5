/// Core CallbackRegistry implementation
use crate::events::{CallbackHandler, RoomEventKind};
use super::stats::CallbackStats;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Handle returned by every registration, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub(super) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered handler.
#[derive(Debug, Clone)]
pub(super) struct Subscription {
    pub(super) id: SubscriptionId,
    pub(super) handler: Arc<dyn CallbackHandler>,
}

/// Publish/subscribe registry for room and player notifications.
///
/// Handlers are grouped by [`RoomEventKind`]. Any number of components can
/// listen to the same kind; each gets its own typed copy of the event.
/// The map is a DashMap so emitters and registrations never contend on a
/// single lock.
pub struct CallbackRegistry {
    pub(super) handlers: DashMap<RoomEventKind, Vec<Subscription>>,
    pub(super) stats: RwLock<CallbackStats>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("kinds", &self.handlers.len())
            .field("stats", &"[stats]")
            .finish()
    }
}

impl CallbackRegistry {
    /// Creates a registry with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            stats: RwLock::new(CallbackStats::default()),
        }
    }

    /// Gets the current registry statistics
    #[inline]
    pub async fn get_stats(&self) -> CallbackStats {
        self.stats.read().await.clone()
    }

    /// Number of handlers listening to `kind`.
    #[inline]
    pub fn handler_count(&self, kind: RoomEventKind) -> usize {
        self.handlers
            .get(&kind)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Whether anyone listens to `kind`.
    #[inline]
    pub fn has_handlers(&self, kind: RoomEventKind) -> bool {
        self.handler_count(kind) > 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
