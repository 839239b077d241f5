//! Error types for the driver, the peer contract and the policy engines.
//!
//! Callback registry errors live next to the event traits in
//! [`crate::events::CallbackError`].

use crate::types::{ActorNumber, ViewId};

/// Errors raised while configuring or running the update driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A rate or cap that must be positive was zero
    #[error("Invalid driver configuration: {0}")]
    InvalidConfiguration(String),

    /// Registering or removing the event forwarder failed
    #[error("Callback registration failed: {0}")]
    Callbacks(#[from] crate::events::CallbackError),

    /// The peer refused a lifecycle request
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

/// Errors reported by a [`crate::peer::NetworkPeer`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeerError {
    /// The peer is not connected to any server
    #[error("Peer is not connected")]
    NotConnected,

    /// The per-object state sync pass could not run
    #[error("State sync failed: {0}")]
    StateSync(String),

    /// Starting the fallback acknowledgement thread failed
    #[error("Fallback ack thread failed to start: {0}")]
    AckThread(String),
}

/// Errors produced by ownership arbitration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    #[error("Unknown networked object {0}")]
    UnknownObject(ViewId),

    #[error("Networked object {0} is already registered")]
    DuplicateObject(ViewId),

    #[error("No pending ownership request for {view} from {requester}")]
    NoPendingRequest { view: ViewId, requester: ActorNumber },

    #[error("{responder} does not own {view} and cannot answer its ownership request")]
    NotOwner { view: ViewId, responder: ActorNumber },
}

/// Errors produced by RPC routing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The call targets the master client but no master is known
    #[error("RPC '{method}' targets the master client but the room has none")]
    NoMasterClient { method: String },
}
