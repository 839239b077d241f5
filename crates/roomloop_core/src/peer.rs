//! Contract between the update driver and the transport-level network peer.
//!
//! The peer owns sockets, reliable/unreliable channels and command
//! serialization. The driver only pumps it.

use crate::error::PeerError;

/// Network endpoint pumped by [`crate::driver::UpdateDriver`].
///
/// Every method must return without blocking. The "more work" booleans let the
/// driver decide how many batches to process in one frame.
pub trait NetworkPeer {
    /// Processes one unit of inbound work (event, operation result or state
    /// change). Returns true if more work is queued.
    fn dispatch_incoming_batch(&mut self) -> bool;

    /// Sends one datagram's worth of queued outgoing commands. Returns true if
    /// more commands remain.
    fn flush_outgoing_batch(&mut self) -> bool;

    /// Runs the per-object state serialization pass for this tick, queueing the
    /// resulting updates as outgoing commands.
    fn run_state_sync_pass(&mut self) -> Result<(), PeerError>;

    /// Starts the helper thread that keeps acknowledgements flowing while the
    /// host stops ticking (loading screens, app in background). Called once
    /// when the driver is enabled.
    fn start_fallback_ack_thread(&mut self) -> Result<(), PeerError> {
        Ok(())
    }
}

impl<P: NetworkPeer + ?Sized> NetworkPeer for Box<P> {
    fn dispatch_incoming_batch(&mut self) -> bool {
        (**self).dispatch_incoming_batch()
    }

    fn flush_outgoing_batch(&mut self) -> bool {
        (**self).flush_outgoing_batch()
    }

    fn run_state_sync_pass(&mut self) -> Result<(), PeerError> {
        (**self).run_state_sync_pass()
    }

    fn start_fallback_ack_thread(&mut self) -> Result<(), PeerError> {
        (**self).start_fallback_ack_thread()
    }
}
