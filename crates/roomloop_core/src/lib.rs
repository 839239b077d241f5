//! # Roomloop Core
//!
//! The per-frame driver of a multiplayer room client, plus the room callback
//! fan-out and the replication policies it serves.
//!
//! ## Core Features
//!
//! - **Update Driver**: dispatches inbound work in fixed updates and flushes
//!   outgoing datagrams in late updates, on independent send and state
//!   serialization timers
//! - **Message Queue Gate**: pauses every dispatch and send while closed
//! - **Room Callbacks**: type-safe async fan-out of room and player
//!   notifications to any number of subscribers
//! - **Scene Sync**: the master client publishes its scene, everyone else
//!   follows it
//! - **Replication Policy**: RPC fan-out targets and buffering, ownership
//!   transfer rules and per-object sync modes
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use roomloop_core::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct IdlePeer;
//!
//! impl NetworkPeer for IdlePeer {
//!     fn dispatch_incoming_batch(&mut self) -> bool { false }
//!     fn flush_outgoing_batch(&mut self) -> bool { false }
//!     fn run_state_sync_pass(&mut self) -> Result<(), PeerError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let callbacks = create_callback_registry();
//!     let loader = Arc::new(RecordingSceneLoader::new());
//!     let scene = Arc::new(SyncedSceneSession::new("Lobby", true, loader));
//!
//!     let mut driver = UpdateDriver::new(DriverConfig::default(), MonotonicClock::new(), scene)?
//!         .with_peer(IdlePeer);
//!     driver.enable(&callbacks).await?;
//!
//!     callbacks.on(|event: PlayerJoinedEvent| {
//!         println!("{} joined", event.player.nickname);
//!         Ok(())
//!     }).await?;
//!
//!     loop {
//!         driver.fixed_update();
//!         driver.late_update(1.0);
//!         tokio::time::sleep(tokio::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```

pub mod callbacks;
pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod gate;
pub mod ownership;
pub mod peer;
pub mod policy;
pub mod rpc;
pub mod scene;
pub mod types;

pub use callbacks::{create_callback_registry, CallbackRegistry, CallbackStats, SubscriptionId};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use driver::{DispatchReport, DriverConfig, DriverStats, TickReport, UpdateDriver};
pub use error::{DriverError, OwnershipError, PeerError, RpcError};
pub use events::{
    CallbackError, CallbackHandler, CreateRoomFailedEvent, Event, FriendListUpdatedEvent,
    JoinRandomFailedEvent, JoinRoomFailedEvent, MasterClientChangedEvent, PlayerJoinedEvent,
    PlayerLeftEvent, PlayerPropertiesChangedEvent, RoomCreatedEvent, RoomEvent, RoomEventKind,
    RoomJoinedEvent, RoomLeftEvent, RoomPropertiesChangedEvent, TypedCallbackHandler,
};
pub use forwarder::RoomEventForwarder;
pub use gate::{MessageQueueGate, SendSignal};
pub use ownership::{
    NetworkedObject, OwnershipArbiter, OwnershipConsent, OwnershipOutcome, RejectReason,
};
pub use peer::NetworkPeer;
pub use policy::{
    ConnectionStrategy, NetworkLogLevel, OwnershipPolicy, RpcFanout, RpcRouting, SyncMode,
};
pub use rpc::{RemoteTargets, RpcBuffer, RpcCall, RpcPlan, RpcRouter};
pub use scene::{
    RecordingSceneLoader, SceneLoader, SceneSession, SyncedSceneSession, CURRENT_SCENE_PROPERTY,
};
pub use types::{ActorNumber, FriendInfo, Player, PropertyTable, ReturnCode, RoomInfo, ViewId};

pub use async_trait::async_trait;
