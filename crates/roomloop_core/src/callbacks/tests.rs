//! Tests for the room callback registry

#[cfg(test)]
mod tests {
    use crate::callbacks::CallbackRegistry;
    use crate::events::{
        CallbackError, JoinRandomFailedEvent, PlayerJoinedEvent, PlayerLeftEvent, RoomEventKind,
    };
    use crate::types::Player;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn joined(actor: i32, name: &str) -> PlayerJoinedEvent {
        PlayerJoinedEvent {
            player: Player::new(actor, name),
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_every_handler_of_the_kind() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            registry
                .on(move |_event: PlayerJoinedEvent| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }

        let delivered = registry.emit(&joined(2, "ada")).await.unwrap();
        assert_eq!(delivered, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(registry.handler_count(RoomEventKind::PlayerJoined), 3);
    }

    #[tokio::test]
    async fn test_emit_is_keyed_by_kind() {
        let registry = CallbackRegistry::new();
        let left_calls = Arc::new(AtomicUsize::new(0));
        let left_calls_clone = left_calls.clone();

        registry
            .on(move |_event: PlayerLeftEvent| {
                left_calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        let delivered = registry.emit(&joined(2, "ada")).await.unwrap();
        assert_eq!(delivered, 0);
        assert_eq!(left_calls.load(Ordering::SeqCst), 0);
        assert!(!registry.has_handlers(RoomEventKind::PlayerJoined));
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_others() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        registry
            .on(|_event: JoinRandomFailedEvent| {
                Err(CallbackError::HandlerExecution("boom".to_string()))
            })
            .await
            .unwrap();
        registry
            .on(move |event: JoinRandomFailedEvent| {
                seen_clone.lock().unwrap().push(event.code);
                Ok(())
            })
            .await
            .unwrap();

        let delivered = registry
            .emit(&JoinRandomFailedEvent {
                code: 32760,
                message: "no match found".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(*seen.lock().unwrap(), vec![32760]);

        let stats = registry.get_stats().await;
        assert_eq!(stats.events_emitted, 1);
        assert_eq!(stats.handler_failures, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_that_handler() {
        let registry = CallbackRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_a = calls.clone();
        let first = registry
            .on(move |_event: PlayerJoinedEvent| {
                calls_a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        let calls_b = calls.clone();
        registry
            .on(move |_event: PlayerJoinedEvent| {
                calls_b.fetch_add(10, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        registry.unsubscribe(first).await.unwrap();
        registry.emit(&joined(4, "lin")).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(registry.get_stats().await.total_handlers, 1);

        let again = registry.unsubscribe(first).await;
        assert!(matches!(again, Err(CallbackError::SubscriptionNotFound(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_all_clears_kinds() {
        let registry = CallbackRegistry::new();
        let a = registry.on(|_e: PlayerJoinedEvent| Ok(())).await.unwrap();
        let b = registry.on(|_e: PlayerLeftEvent| Ok(())).await.unwrap();

        assert_eq!(registry.handler_counts().len(), 2);
        let removed = registry.unsubscribe_all(&[a, b, a]).await;

        assert_eq!(removed, 2);
        assert!(registry.handler_counts().is_empty());
        assert_eq!(registry.get_stats().await.total_handlers, 0);
    }
}
