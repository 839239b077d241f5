//! Room callbacks the driver itself listens to.
//!
//! Two notifications matter to the driver: a freshly created room gets the
//! current scene published into its properties, and a room property change may
//! require loading the synced scene. Everything else is observed for logging
//! only and left to whatever else subscribed.

use crate::callbacks::{CallbackRegistry, SubscriptionId};
use crate::events::{
    CallbackError, CreateRoomFailedEvent, FriendListUpdatedEvent, JoinRandomFailedEvent,
    JoinRoomFailedEvent, MasterClientChangedEvent, PlayerJoinedEvent, PlayerLeftEvent,
    PlayerPropertiesChangedEvent, RoomCreatedEvent, RoomJoinedEvent, RoomLeftEvent,
    RoomPropertiesChangedEvent,
};
use crate::scene::SceneSession;
use std::sync::Arc;
use tracing::debug;

/// Subscribes the driver's own room/player handlers.
#[derive(Debug, Clone)]
pub struct RoomEventForwarder {
    scene: Arc<dyn SceneSession>,
}

impl RoomEventForwarder {
    pub fn new(scene: Arc<dyn SceneSession>) -> Self {
        Self { scene }
    }

    /// Registers one handler per room event kind and returns their ids.
    ///
    /// If any registration fails the ones already made are rolled back.
    pub async fn subscribe(
        &self,
        registry: &CallbackRegistry,
    ) -> Result<Vec<SubscriptionId>, CallbackError> {
        let mut ids = Vec::with_capacity(12);
        if let Err(e) = self.subscribe_into(registry, &mut ids).await {
            registry.unsubscribe_all(&ids).await;
            return Err(e);
        }
        Ok(ids)
    }

    async fn subscribe_into(
        &self,
        registry: &CallbackRegistry,
        ids: &mut Vec<SubscriptionId>,
    ) -> Result<(), CallbackError> {
        let scene = self.scene.clone();
        ids.push(
            registry
                .on(move |event: RoomCreatedEvent| {
                    debug!("Room '{}' created", event.room.name);
                    let level = scene.active_scene_name();
                    scene.set_level_in_props_if_synced(&level);
                    Ok(())
                })
                .await?,
        );

        let scene = self.scene.clone();
        ids.push(
            registry
                .on(move |event: RoomPropertiesChangedEvent| {
                    debug!("Room properties changed: {} keys", event.changed.len());
                    scene.load_level_if_synced();
                    Ok(())
                })
                .await?,
        );

        ids.push(
            registry
                .on(|event: RoomJoinedEvent| {
                    debug!("Joined room '{}' as {}", event.room.name, event.local_actor);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: RoomLeftEvent| {
                    debug!("Left room '{}'", event.room_name);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: PlayerJoinedEvent| {
                    debug!("Player {} entered the room", event.player.actor);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: PlayerLeftEvent| {
                    debug!("Player {} left the room", event.player.actor);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: PlayerPropertiesChangedEvent| {
                    debug!(
                        "Player {} properties changed: {} keys",
                        event.player.actor,
                        event.changed.len()
                    );
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: MasterClientChangedEvent| {
                    debug!("Master client is now {}", event.new_master.actor);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: FriendListUpdatedEvent| {
                    debug!("Friend list updated: {} entries", event.friends.len());
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: CreateRoomFailedEvent| {
                    debug!("Create room failed ({}): {}", event.code, event.message);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: JoinRoomFailedEvent| {
                    debug!("Join room failed ({}): {}", event.code, event.message);
                    Ok(())
                })
                .await?,
        );
        ids.push(
            registry
                .on(|event: JoinRandomFailedEvent| {
                    debug!("Join random failed ({}): {}", event.code, event.message);
                    Ok(())
                })
                .await?,
        );

        Ok(())
    }
}
