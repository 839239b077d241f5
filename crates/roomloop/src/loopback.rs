//! In-memory network peer used when the client runs without a server.
//!
//! Every datagram flushed by the driver is looped straight back into the
//! inbound queue, so dispatch, state sync and sending all see realistic work
//! while playing offline.

use roomloop_core::{NetworkPeer, PeerError, SyncMode, ViewId};
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

/// Default number of commands packed into one datagram.
pub const DEFAULT_COMMANDS_PER_DATAGRAM: usize = 4;

#[derive(Debug, Clone, Copy)]
struct TrackedObject {
    sync: SyncMode,
    changed: bool,
}

/// Counters reported by [`LoopbackPeer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    pub commands_queued: u64,
    pub datagrams_sent: u64,
    pub messages_dispatched: u64,
    pub sync_passes: u64,
}

/// A [`NetworkPeer`] that talks to itself.
#[derive(Debug)]
pub struct LoopbackPeer {
    connected: bool,
    commands_per_datagram: usize,
    outgoing: VecDeque<Value>,
    inbound: VecDeque<Value>,
    delivered: Vec<Value>,
    objects: BTreeMap<ViewId, TrackedObject>,
    ack_thread_running: bool,
    stats: LoopbackStats,
}

impl Default for LoopbackPeer {
    fn default() -> Self {
        Self::new(DEFAULT_COMMANDS_PER_DATAGRAM)
    }
}

impl LoopbackPeer {
    pub fn new(commands_per_datagram: usize) -> Self {
        Self {
            connected: true,
            commands_per_datagram: commands_per_datagram.max(1),
            outgoing: VecDeque::new(),
            inbound: VecDeque::new(),
            delivered: Vec::new(),
            objects: BTreeMap::new(),
            ack_thread_running: false,
            stats: LoopbackStats::default(),
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn ack_thread_running(&self) -> bool {
        self.ack_thread_running
    }

    pub fn stats(&self) -> LoopbackStats {
        self.stats
    }

    /// Queues an arbitrary outgoing command (an RPC, a property update...).
    pub fn queue_command(&mut self, command: Value) {
        self.stats.commands_queued += 1;
        self.outgoing.push_back(command);
    }

    /// Starts replicating `view` with the given mode.
    pub fn track_object(&mut self, view: ViewId, sync: SyncMode) {
        self.objects.insert(view, TrackedObject { sync, changed: true });
    }

    pub fn untrack_object(&mut self, view: ViewId) {
        self.objects.remove(&view);
    }

    /// Flags `view` as changed since the last sync pass.
    pub fn mark_changed(&mut self, view: ViewId) {
        if let Some(object) = self.objects.get_mut(&view) {
            object.changed = true;
        }
    }

    pub fn pending_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Takes every message dispatched since the last call.
    pub fn take_delivered(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.delivered)
    }
}

impl NetworkPeer for LoopbackPeer {
    fn dispatch_incoming_batch(&mut self) -> bool {
        if let Some(message) = self.inbound.pop_front() {
            trace!("Dispatching {}", message);
            self.stats.messages_dispatched += 1;
            self.delivered.push(message);
        }
        !self.inbound.is_empty()
    }

    fn flush_outgoing_batch(&mut self) -> bool {
        let take = self.commands_per_datagram.min(self.outgoing.len());
        if take > 0 {
            self.inbound.extend(self.outgoing.drain(..take));
            self.stats.datagrams_sent += 1;
        }
        !self.outgoing.is_empty()
    }

    fn run_state_sync_pass(&mut self) -> Result<(), PeerError> {
        if !self.connected {
            return Err(PeerError::NotConnected);
        }

        let mut produced = Vec::new();
        for (view, object) in self.objects.iter_mut() {
            if !object.sync.is_enabled() {
                continue;
            }
            if object.sync.sends_only_on_change() && !object.changed {
                continue;
            }
            object.changed = false;
            produced.push(json!({
                "type": "state",
                "view": view.0,
                "reliable": object.sync.is_reliable(),
                "delta": object.sync.uses_delta_compression(),
            }));
        }

        debug!("State sync pass produced {} updates", produced.len());
        self.stats.sync_passes += 1;
        self.stats.commands_queued += produced.len() as u64;
        self.outgoing.extend(produced);
        Ok(())
    }

    fn start_fallback_ack_thread(&mut self) -> Result<(), PeerError> {
        if self.ack_thread_running {
            return Err(PeerError::AckThread("already running".to_string()));
        }
        self.ack_thread_running = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_packs_commands_and_loops_them_back() {
        let mut peer = LoopbackPeer::new(2);
        for i in 0..5 {
            peer.queue_command(json!({ "n": i }));
        }

        assert!(peer.flush_outgoing_batch());
        assert!(peer.flush_outgoing_batch());
        assert!(!peer.flush_outgoing_batch());
        assert_eq!(peer.stats().datagrams_sent, 3);
        assert_eq!(peer.pending_inbound(), 5);

        let mut dispatched = 0;
        while peer.dispatch_incoming_batch() {
            dispatched += 1;
        }
        assert_eq!(dispatched + 1, 5);
        assert_eq!(peer.take_delivered().len(), 5);
        assert!(peer.take_delivered().is_empty());
    }

    #[test]
    fn test_sync_pass_honours_sync_modes() {
        let mut peer = LoopbackPeer::default();
        peer.track_object(ViewId(1), SyncMode::Off);
        peer.track_object(ViewId(2), SyncMode::Unreliable);
        peer.track_object(ViewId(3), SyncMode::UnreliableOnChange);
        peer.track_object(ViewId(4), SyncMode::ReliableDeltaCompressed);

        peer.run_state_sync_pass().unwrap();
        assert_eq!(peer.pending_outgoing(), 3);

        // Only the full-state mode resends unchanged objects
        peer.run_state_sync_pass().unwrap();
        assert_eq!(peer.pending_outgoing(), 4);

        peer.mark_changed(ViewId(3));
        peer.run_state_sync_pass().unwrap();
        assert_eq!(peer.pending_outgoing(), 6);
    }

    #[test]
    fn test_disconnected_peer_fails_sync() {
        let mut peer = LoopbackPeer::default();
        peer.set_connected(false);
        assert_eq!(peer.run_state_sync_pass(), Err(PeerError::NotConnected));
    }

    #[test]
    fn test_ack_thread_starts_once() {
        let mut peer = LoopbackPeer::default();
        assert!(peer.start_fallback_ack_thread().is_ok());
        assert!(peer.ack_thread_running());
        assert!(peer.start_fallback_ack_thread().is_err());
    }
}
