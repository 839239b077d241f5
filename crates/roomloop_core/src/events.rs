//! # Room and Player Events
//!
//! Event traits, the type-erased handler abstraction and every room/player
//! lifecycle notification the callback registry can fan out.
//!
//! ## Event Kinds
//!
//! - Room lifecycle: created, joined, left, properties changed
//! - Player lifecycle: joined, left, properties changed, master switched
//! - Social: friend list updated
//! - Matchmaking failures: create, join and join-random failed
//!
//! Every event is a plain serde struct. Handlers receive their own typed copy,
//! decoded from a single serialized buffer produced at emit time.

use crate::types::{ActorNumber, FriendInfo, Player, PropertyTable, ReturnCode, RoomInfo};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt::{self, Debug};

// ============================================================================
// Event Traits
// ============================================================================

/// Anything that can travel through the callback registry.
///
/// Implemented automatically for serde types that are `Send + Sync + Debug`.
pub trait Event: Send + Sync + Any + Debug {
    /// Stable type name used in handler names and log lines.
    fn type_name() -> &'static str
    where
        Self: Sized;

    fn serialize(&self) -> Result<Vec<u8>, CallbackError>;

    fn deserialize(data: &[u8]) -> Result<Self, CallbackError>
    where
        Self: Sized;

    fn as_any(&self) -> &dyn Any;
}

impl<T> Event for T
where
    T: Serialize + DeserializeOwned + Send + Sync + Any + Debug + 'static,
{
    fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    fn serialize(&self) -> Result<Vec<u8>, CallbackError> {
        serde_json::to_vec(self).map_err(|e| {
            tracing::error!(
                "🔴 Event serialization failed for type '{}': {}",
                Self::type_name(),
                e
            );
            CallbackError::Serialization(e)
        })
    }

    fn deserialize(data: &[u8]) -> Result<Self, CallbackError> {
        serde_json::from_slice(data).map_err(|e| {
            tracing::error!(
                "🔴 Event deserialization failed for type '{}': {} ({} bytes)",
                Self::type_name(),
                e,
                data.len()
            );
            CallbackError::Deserialization(e)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A room/player notification bound to exactly one [`RoomEventKind`].
pub trait RoomEvent: Event {
    const KIND: RoomEventKind;
}

/// Type-erased handler stored by the registry.
#[async_trait]
pub trait CallbackHandler: Send + Sync + Debug + 'static {
    /// Decodes the serialized event and runs the handler.
    async fn handle(&self, data: &[u8]) -> Result<(), CallbackError>;

    /// TypeId of the event type this handler decodes.
    fn expected_type_id(&self) -> TypeId;

    fn handler_name(&self) -> &str;
}

/// Bridges a typed closure to [`CallbackHandler`].
pub struct TypedCallbackHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), CallbackError> + Send + Sync,
{
    handler: F,
    name: String,
    _phantom: std::marker::PhantomData<fn(T)>,
}

impl<T, F> TypedCallbackHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), CallbackError> + Send + Sync,
{
    pub fn new(name: String, handler: F) -> Self {
        Self {
            handler,
            name,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> Debug for TypedCallbackHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), CallbackError> + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCallbackHandler")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<T, F> CallbackHandler for TypedCallbackHandler<T, F>
where
    T: Event,
    F: Fn(T) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    async fn handle(&self, data: &[u8]) -> Result<(), CallbackError> {
        let event = T::deserialize(data)?;
        (self.handler)(event)
    }

    fn expected_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Event Kinds
// ============================================================================

/// Closed set of notifications the registry routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEventKind {
    RoomCreated,
    RoomPropertiesChanged,
    RoomJoined,
    RoomLeft,
    PlayerJoined,
    PlayerLeft,
    PlayerPropertiesChanged,
    MasterClientChanged,
    FriendListUpdated,
    CreateRoomFailed,
    JoinRoomFailed,
    JoinRandomFailed,
}

impl RoomEventKind {
    pub const ALL: [RoomEventKind; 12] = [
        RoomEventKind::RoomCreated,
        RoomEventKind::RoomPropertiesChanged,
        RoomEventKind::RoomJoined,
        RoomEventKind::RoomLeft,
        RoomEventKind::PlayerJoined,
        RoomEventKind::PlayerLeft,
        RoomEventKind::PlayerPropertiesChanged,
        RoomEventKind::MasterClientChanged,
        RoomEventKind::FriendListUpdated,
        RoomEventKind::CreateRoomFailed,
        RoomEventKind::JoinRoomFailed,
        RoomEventKind::JoinRandomFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoomEventKind::RoomCreated => "room_created",
            RoomEventKind::RoomPropertiesChanged => "room_properties_changed",
            RoomEventKind::RoomJoined => "room_joined",
            RoomEventKind::RoomLeft => "room_left",
            RoomEventKind::PlayerJoined => "player_joined",
            RoomEventKind::PlayerLeft => "player_left",
            RoomEventKind::PlayerPropertiesChanged => "player_properties_changed",
            RoomEventKind::MasterClientChanged => "master_client_changed",
            RoomEventKind::FriendListUpdated => "friend_list_updated",
            RoomEventKind::CreateRoomFailed => "create_room_failed",
            RoomEventKind::JoinRoomFailed => "join_room_failed",
            RoomEventKind::JoinRandomFailed => "join_random_failed",
        }
    }

    /// Whether this kind reports a matchmaking failure.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            RoomEventKind::CreateRoomFailed
                | RoomEventKind::JoinRoomFailed
                | RoomEventKind::JoinRandomFailed
        )
    }
}

impl fmt::Display for RoomEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Room Events
// ============================================================================

/// This client created a room (and is in it as master).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreatedEvent {
    pub room: RoomInfo,
}

/// Custom room properties changed. Only the changed keys are included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPropertiesChangedEvent {
    pub changed: PropertyTable,
}

/// This client entered a room, either created or joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomJoinedEvent {
    pub room: RoomInfo,
    pub local_actor: ActorNumber,
}

/// This client left its room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomLeftEvent {
    pub room_name: String,
}

/// Another player entered the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedEvent {
    pub player: Player,
}

/// Another player left the room or became inactive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftEvent {
    pub player: Player,
}

/// Custom properties of a player changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPropertiesChangedEvent {
    pub player: Player,
    pub changed: PropertyTable,
}

/// The master client role moved to another player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterClientChangedEvent {
    pub new_master: Player,
}

/// The server answered a friend list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendListUpdatedEvent {
    pub friends: Vec<FriendInfo>,
}

/// Creating a room failed on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomFailedEvent {
    pub code: ReturnCode,
    pub message: String,
}

/// Joining a named room failed on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomFailedEvent {
    pub code: ReturnCode,
    pub message: String,
}

/// Joining a random room failed, usually because none matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRandomFailedEvent {
    pub code: ReturnCode,
    pub message: String,
}

macro_rules! bind_room_event {
    ($($event:ty => $kind:ident),* $(,)?) => {
        $(
            impl RoomEvent for $event {
                const KIND: RoomEventKind = RoomEventKind::$kind;
            }
        )*
    };
}

bind_room_event! {
    RoomCreatedEvent => RoomCreated,
    RoomPropertiesChangedEvent => RoomPropertiesChanged,
    RoomJoinedEvent => RoomJoined,
    RoomLeftEvent => RoomLeft,
    PlayerJoinedEvent => PlayerJoined,
    PlayerLeftEvent => PlayerLeft,
    PlayerPropertiesChangedEvent => PlayerPropertiesChanged,
    MasterClientChangedEvent => MasterClientChanged,
    FriendListUpdatedEvent => FriendListUpdated,
    CreateRoomFailedEvent => CreateRoomFailed,
    JoinRoomFailedEvent => JoinRoomFailed,
    JoinRandomFailedEvent => JoinRandomFailed,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while registering, removing or running handlers.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// A handler reported a failure of its own
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}
