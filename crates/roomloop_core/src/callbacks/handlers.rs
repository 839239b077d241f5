/// Handler registration and removal
use crate::events::{CallbackError, CallbackHandler, RoomEvent, TypedCallbackHandler};
use super::core::{CallbackRegistry, Subscription, SubscriptionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl CallbackRegistry {
    /// Registers a handler for the event type `E`.
    ///
    /// The handler is keyed by `E::KIND` and receives a decoded copy of every
    /// emitted `E`. Keep the returned id to unsubscribe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roomloop_core::{CallbackRegistry, PlayerJoinedEvent};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let registry = CallbackRegistry::new();
    /// let id = registry.on(|event: PlayerJoinedEvent| {
    ///     println!("{} joined", event.player.nickname);
    ///     Ok(())
    /// }).await?;
    /// registry.unsubscribe(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn on<E, F>(&self, handler: F) -> Result<SubscriptionId, CallbackError>
    where
        E: RoomEvent + 'static,
        F: Fn(E) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let name = format!("{}::{}", E::KIND, E::type_name());
        let typed = TypedCallbackHandler::new(name, handler);
        self.register(E::KIND, Arc::new(typed)).await
    }

    /// Registers an already type-erased handler under `kind`.
    pub async fn register(
        &self,
        kind: crate::events::RoomEventKind,
        handler: Arc<dyn CallbackHandler>,
    ) -> Result<SubscriptionId, CallbackError> {
        let id = SubscriptionId::new();
        let name = handler.handler_name().to_string();

        self.handlers
            .entry(kind)
            .or_insert_with(Vec::new)
            .push(Subscription { id, handler });

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;

        debug!("📝 Registered handler {} for {} ({})", name, kind, id);
        Ok(id)
    }

    /// Removes one subscription.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CallbackError> {
        let mut removed = false;

        for mut entry in self.handlers.iter_mut() {
            let subscriptions = entry.value_mut();
            let before = subscriptions.len();
            subscriptions.retain(|s| s.id != id);
            if subscriptions.len() != before {
                removed = true;
                break;
            }
        }

        if !removed {
            return Err(CallbackError::SubscriptionNotFound(id.to_string()));
        }

        self.handlers.retain(|_, subscriptions| !subscriptions.is_empty());

        let mut stats = self.stats.write().await;
        stats.total_handlers = stats.total_handlers.saturating_sub(1);
        debug!("🗑️ Removed subscription {}", id);
        Ok(())
    }

    /// Removes every subscription in `ids`, skipping unknown ones.
    ///
    /// Returns how many were actually removed.
    pub async fn unsubscribe_all(&self, ids: &[SubscriptionId]) -> usize {
        let mut removed = 0;
        for id in ids {
            match self.unsubscribe(*id).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("⚠️ {}", e),
            }
        }
        if removed > 0 {
            info!("🗑️ Removed {} room callback subscriptions", removed);
        }
        removed
    }
}
