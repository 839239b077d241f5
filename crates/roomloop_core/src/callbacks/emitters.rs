/// Event emission
use crate::events::{CallbackError, RoomEvent};
use super::core::CallbackRegistry;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

impl CallbackRegistry {
    /// Emits `event` to every handler registered for its kind.
    ///
    /// The event is serialized once; handlers run concurrently and a failing
    /// handler does not stop the others. Returns how many handlers completed
    /// successfully. Having no handlers is not an error.
    pub async fn emit<E>(&self, event: &E) -> Result<usize, CallbackError>
    where
        E: RoomEvent,
    {
        let data = Arc::new(event.serialize()?);

        // Clone the list so no map shard stays locked while handlers run
        let subscriptions = self
            .handlers
            .get(&E::KIND)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut succeeded = 0usize;
        let mut failed = 0u64;

        if subscriptions.is_empty() {
            debug!("No handlers for {}", E::KIND);
        } else {
            debug!("📤 Emitting {} to {} handlers", E::KIND, subscriptions.len());

            let mut pending = FuturesUnordered::new();
            for subscription in subscriptions.iter() {
                let data = data.clone();
                let handler = subscription.handler.clone();
                pending.push(async move {
                    let outcome = handler.handle(&data).await;
                    (handler, outcome)
                });
            }

            while let Some((handler, outcome)) = pending.next().await {
                match outcome {
                    Ok(()) => succeeded += 1,
                    Err(e) => {
                        failed += 1;
                        error!("❌ Handler {} failed: {}", handler.handler_name(), e);
                    }
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_failures += failed;

        Ok(succeeded)
    }

    /// Handler counts per kind, for diagnostics.
    pub fn handler_counts(&self) -> BTreeMap<crate::events::RoomEventKind, usize> {
        self.handlers
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect()
    }
}
