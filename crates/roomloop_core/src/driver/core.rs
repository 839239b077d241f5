/// Core UpdateDriver implementation
use super::config::{validate_rate, DriverConfig};
use super::stats::DriverStats;
use crate::callbacks::{CallbackRegistry, SubscriptionId};
use crate::clock::{Clock, MonotonicClock};
use crate::error::DriverError;
use crate::forwarder::RoomEventForwarder;
use crate::gate::{MessageQueueGate, SendSignal};
use crate::peer::NetworkPeer;
use crate::scene::SceneSession;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one inbound dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Batches the peer processed in this pass
    pub batches: usize,
    /// The pass stopped at the cap while the peer still had work
    pub capped: bool,
    /// No peer was attached
    pub skipped: bool,
}

/// Outcome of one late update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Set when the late update also dispatched (low host time scale)
    pub dispatch: Option<DispatchReport>,
    /// A state sync pass ran successfully
    pub serialized: bool,
    /// The send timer or a send request fired
    pub send_fired: bool,
    pub datagrams_sent: usize,
    /// No peer was attached
    pub skipped: bool,
}

/// Pumps a [`NetworkPeer`] from the host's frame callbacks.
///
/// The host calls [`fixed_update`](Self::fixed_update) from its fixed-step
/// callback and [`late_update`](Self::late_update) once per rendered frame,
/// after game code ran. Inbound work is drained in fixed updates; state sync
/// and outgoing flushes run in late updates on their own timers.
///
/// The driver is owned by the host loop. Other subsystems steer it through the
/// shared [`MessageQueueGate`] and [`SendSignal`] handles.
pub struct UpdateDriver<P: NetworkPeer, C: Clock = MonotonicClock> {
    config: DriverConfig,
    peer: Option<P>,
    clock: C,
    gate: MessageQueueGate,
    send_signal: SendSignal,
    scene: Arc<dyn SceneSession>,
    forwarder: RoomEventForwarder,
    send_interval_ms: u64,
    serialize_interval_ms: u64,
    next_send_at: u64,
    next_serialize_at: u64,
    subscriptions: Vec<SubscriptionId>,
    enabled: bool,
    ack_thread_started: bool,
    stats: DriverStats,
}

impl<P: NetworkPeer, C: Clock> std::fmt::Debug for UpdateDriver<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDriver")
            .field("config", &self.config)
            .field("peer", &self.peer.is_some())
            .field("enabled", &self.enabled)
            .field("next_send_at", &self.next_send_at)
            .field("next_serialize_at", &self.next_serialize_at)
            .finish()
    }
}

impl<P: NetworkPeer, C: Clock> UpdateDriver<P, C> {
    /// Creates a driver with no peer attached.
    pub fn new(
        config: DriverConfig,
        clock: C,
        scene: Arc<dyn SceneSession>,
    ) -> Result<Self, DriverError> {
        config.validate()?;

        Ok(Self {
            send_interval_ms: config.send_interval_ms(),
            serialize_interval_ms: config.serialize_interval_ms(),
            config,
            peer: None,
            clock,
            gate: MessageQueueGate::new(),
            send_signal: SendSignal::new(),
            forwarder: RoomEventForwarder::new(scene.clone()),
            scene,
            next_send_at: 0,
            next_serialize_at: 0,
            subscriptions: Vec::new(),
            enabled: false,
            ack_thread_started: false,
            stats: DriverStats::default(),
        })
    }

    /// Attaches `peer`, builder style.
    pub fn with_peer(mut self, peer: P) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Uses an existing gate handle instead of a private one.
    pub fn with_gate(mut self, gate: MessageQueueGate) -> Self {
        self.gate = gate;
        self
    }

    /// Uses an existing send request handle instead of a private one.
    pub fn with_send_signal(mut self, signal: SendSignal) -> Self {
        self.send_signal = signal;
        self
    }

    /// Attaches a peer, returning the previous one.
    pub fn attach_peer(&mut self, peer: P) -> Option<P> {
        self.peer.replace(peer)
    }

    /// Detaches and returns the peer. Ticks become no-ops until a new one is
    /// attached.
    pub fn detach_peer(&mut self) -> Option<P> {
        self.peer.take()
    }

    pub fn peer(&self) -> Option<&P> {
        self.peer.as_ref()
    }

    pub fn peer_mut(&mut self) -> Option<&mut P> {
        self.peer.as_mut()
    }

    pub fn gate(&self) -> &MessageQueueGate {
        &self.gate
    }

    pub fn send_signal(&self) -> &SendSignal {
        &self.send_signal
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Next time (clock ms) the send timer fires.
    pub fn next_send_at(&self) -> u64 {
        self.next_send_at
    }

    /// Next time (clock ms) a state sync pass runs.
    pub fn next_serialize_at(&self) -> u64 {
        self.next_serialize_at
    }

    /// Changes the send rate; the new interval applies from the next firing.
    pub fn set_send_rate(&mut self, rate: u32) -> Result<(), DriverError> {
        validate_rate("send_rate", rate)?;
        self.config.send_rate = rate;
        self.send_interval_ms = self.config.send_interval_ms();
        debug!("Send interval is now {} ms", self.send_interval_ms);
        Ok(())
    }

    /// Changes the serialization rate; the new interval applies from the next
    /// pass.
    pub fn set_serialization_rate(&mut self, rate: u32) -> Result<(), DriverError> {
        validate_rate("serialization_rate", rate)?;
        let candidate = DriverConfig {
            serialization_rate: rate,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.config = candidate;
        self.serialize_interval_ms = self.config.serialize_interval_ms();
        debug!("Serialization interval is now {} ms", self.serialize_interval_ms);
        Ok(())
    }

    /// Hooks the driver into the session: subscribes its room handlers and
    /// starts the peer's fallback ack thread (first enable only).
    pub async fn enable(&mut self, registry: &CallbackRegistry) -> Result<(), DriverError> {
        if self.enabled {
            warn!("⚠️ Update driver is already enabled");
            return Ok(());
        }

        self.send_interval_ms = self.config.send_interval_ms();
        self.serialize_interval_ms = self.config.serialize_interval_ms();

        if !self.ack_thread_started {
            match self.peer.as_mut() {
                Some(peer) => {
                    peer.start_fallback_ack_thread()?;
                    self.ack_thread_started = true;
                }
                None => warn!("⚠️ No network peer attached, fallback ack thread not started"),
            }
        }

        self.subscriptions = self.forwarder.subscribe(registry).await?;
        self.enabled = true;

        info!(
            "🔄 Update driver enabled (send every {} ms, sync every {} ms, {} room handlers)",
            self.send_interval_ms,
            self.serialize_interval_ms,
            self.subscriptions.len()
        );
        Ok(())
    }

    /// Removes every subscription made by [`enable`](Self::enable).
    pub async fn disable(&mut self, registry: &CallbackRegistry) {
        if !self.enabled {
            return;
        }
        let subscriptions = std::mem::take(&mut self.subscriptions);
        registry.unsubscribe_all(&subscriptions).await;
        self.enabled = false;
        info!("⏹️ Update driver disabled");
    }

    /// Forwards the host's "scene loaded" notification to the session.
    pub fn on_scene_loaded(&self, scene_name: &str) {
        self.scene.new_scene_loaded(scene_name);
    }

    /// Fixed-step callback: drains inbound work.
    pub fn fixed_update(&mut self) -> DispatchReport {
        self.stats.fixed_updates += 1;
        self.dispatch()
    }

    /// Per-frame callback, after game code: state sync and outgoing flush.
    ///
    /// `time_scale` is the host's current time scale. When the host slows
    /// time enough that fixed updates stop, dispatching moves here.
    pub fn late_update(&mut self, time_scale: f32) -> TickReport {
        self.stats.late_updates += 1;
        let mut report = TickReport::default();

        if self.peer.is_none() {
            error!("🔴 Network peer missing, skipping late update");
            self.stats.skipped_passes += 1;
            report.skipped = true;
            return report;
        }

        if time_scale <= self.config.min_time_scale_to_dispatch_in_fixed_update {
            report.dispatch = Some(self.dispatch());
        }

        let Some(peer) = self.peer.as_mut() else {
            return report;
        };

        let now = self.clock.now_ms();
        if self.gate.is_running() && now >= self.next_serialize_at {
            match peer.run_state_sync_pass() {
                Ok(()) => {
                    report.serialized = true;
                    self.stats.state_sync_passes += 1;
                    // Send what the pass produced without waiting for the send timer
                    self.next_send_at = 0;
                }
                Err(e) => {
                    self.stats.state_sync_failures += 1;
                    warn!("⚠️ State sync pass failed: {}", e);
                }
            }
            self.next_serialize_at = (now + self.serialize_interval_ms)
                .saturating_sub(self.config.serialize_frame_correction_ms);
        }

        let now = self.clock.now_ms();
        let requested = self.send_signal.take();
        if requested || now >= self.next_send_at {
            let mut more = true;
            let mut sent = 0usize;
            while self.gate.is_running() && more && sent < self.config.max_datagrams {
                more = peer.flush_outgoing_batch();
                sent += 1;
            }

            report.send_fired = true;
            report.datagrams_sent = sent;
            self.stats.send_firings += 1;
            self.stats.datagrams_sent += sent as u64;
            self.next_send_at = now + self.send_interval_ms;
        }

        report
    }

    /// Drains inbound work until the peer reports none, the gate closes or
    /// the per-pass cap is reached.
    pub fn dispatch(&mut self) -> DispatchReport {
        let Some(peer) = self.peer.as_mut() else {
            error!("🔴 Network peer missing, skipping dispatch");
            self.stats.skipped_passes += 1;
            return DispatchReport {
                skipped: true,
                ..DispatchReport::default()
            };
        };

        let cap = self.config.max_dispatch_per_tick;
        let mut batches = 0usize;
        let mut more = true;
        while self.gate.is_running() && more && batches < cap {
            more = peer.dispatch_incoming_batch();
            batches += 1;
        }

        let capped = more && batches >= cap;
        if capped {
            self.stats.capped_dispatches += 1;
            debug!("Dispatch stopped at {} batches with inbound work left", cap);
        }
        self.stats.batches_dispatched += batches as u64;

        DispatchReport {
            batches,
            capped,
            skipped: false,
        }
    }
}
