//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that plays the part of the
//! host engine: it owns the update driver, runs the frame loop that calls the
//! fixed and late updates, and reacts to shutdown signals.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    host::{FrameStepper, HostSceneLoader},
    logging::display_banner,
    loopback::LoopbackPeer,
    signals::setup_signal_handlers,
};
use roomloop_core::{
    create_callback_registry, ActorNumber, CallbackRegistry, ConnectionStrategy, MonotonicClock,
    NetworkedObject, OwnershipArbiter, OwnershipPolicy, Player, PlayerJoinedEvent,
    PlayerLeftEvent, RemoteTargets, RoomCreatedEvent, RoomInfo, RoomJoinedEvent, RoomLeftEvent,
    RoomPropertiesChangedEvent, RpcBuffer, RpcCall, RpcFanout, RpcRouter, SceneSession,
    SubscriptionId, SyncMode, SyncedSceneSession, TickReport, UpdateDriver, ViewId,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Actor number the local client gets in an offline room.
const LOCAL_ACTOR: ActorNumber = ActorNumber(1);

/// View id of the local player's avatar.
const AVATAR_VIEW: ViewId = ViewId(1001);

/// Main application struct.
///
/// Owns the update driver and everything the driver talks to. Offline play
/// uses a [`LoopbackPeer`], so the whole send/dispatch path runs without a
/// server.
pub struct Application {
    config: AppConfig,
    callbacks: Arc<CallbackRegistry>,
    scene: Arc<SyncedSceneSession>,
    loader: Arc<HostSceneLoader>,
    driver: UpdateDriver<LoopbackPeer>,
    stepper: FrameStepper,
    ownership: OwnershipArbiter,
    rpc_buffer: RpcBuffer,
    local_player: Player,
    master: Option<ActorNumber>,
    connect_method: Option<ConnectionStrategy>,
    /// Scene whose load started last frame; the gate stays closed until it
    /// completes
    loading_scene: Option<String>,
    app_subscriptions: Vec<SubscriptionId>,
    frames: u64,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates the result and
    /// builds the driver with a loopback peer attached.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(send_rate) = args.send_rate {
            config.driver.send_rate = send_rate;
        }
        if let Some(serialization_rate) = args.serialization_rate {
            config.driver.serialization_rate = serialization_rate;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();
        Self::from_config(config)
    }

    /// Builds the application from an already validated configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let loader = Arc::new(HostSceneLoader::new());
        let scene = Arc::new(SyncedSceneSession::new(
            config.session.scene_name.clone(),
            config.session.auto_sync_scene,
            loader.clone(),
        ));

        let driver = UpdateDriver::new(
            config.to_driver_config(),
            MonotonicClock::new(),
            scene.clone(),
        )?
        .with_peer(LoopbackPeer::default());

        let local_player = Player::new(LOCAL_ACTOR, config.session.nickname.clone());

        Ok(Self {
            stepper: FrameStepper::new(config.host.fixed_timestep_ms),
            config,
            callbacks: create_callback_registry(),
            scene,
            loader,
            driver,
            ownership: OwnershipArbiter::new(),
            rpc_buffer: RpcBuffer::new(),
            local_player,
            master: None,
            connect_method: None,
            loading_scene: None,
            app_subscriptions: Vec::new(),
            frames: 0,
        })
    }

    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    pub fn driver(&self) -> &UpdateDriver<LoopbackPeer> {
        &self.driver
    }

    pub fn scene(&self) -> &Arc<SyncedSceneSession> {
        &self.scene
    }

    pub fn rpc_buffer(&self) -> &RpcBuffer {
        &self.rpc_buffer
    }

    pub fn ownership(&self) -> &OwnershipArbiter {
        &self.ownership
    }

    /// Runs the frame loop until a shutdown signal arrives.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting roomloop client...");
        self.log_configuration_summary();

        self.start_session().await?;

        let mut frame_timer = tokio::time::interval(Duration::from_millis(
            self.config.host.frame_interval_ms,
        ));
        frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats_timer =
            tokio::time::interval(Duration::from_secs(self.config.host.stats_interval_secs));
        stats_timer.tick().await;

        let shutdown = setup_signal_handlers();
        tokio::pin!(shutdown);

        info!("🛑 Press Ctrl+C to stop");
        let mut last_frame = Instant::now();
        loop {
            tokio::select! {
                _ = frame_timer.tick() => {
                    let now = Instant::now();
                    let elapsed_ms = now.duration_since(last_frame).as_secs_f64() * 1000.0;
                    last_frame = now;
                    self.frame(elapsed_ms).await;
                }
                _ = stats_timer.tick() => {
                    self.log_statistics().await;
                }
                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("❌ Signal handling failed: {}", e);
                    }
                    break;
                }
            }
        }

        self.stop_session().await;
        self.log_statistics().await;
        info!("✅ Roomloop client shutdown complete");
        Ok(())
    }

    /// Connects, creates an offline room and spawns the local avatar.
    pub async fn start_session(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let strategy = self.config.session.connection_strategy;
        self.connect_method = Some(strategy);
        info!(
            "🌐 Connecting with {:?} (region ping: {}) through the loopback peer",
            strategy,
            strategy.pings_regions()
        );

        self.driver.enable(&self.callbacks).await?;
        self.subscribe_app_handlers().await?;

        let mut room = RoomInfo::new(self.config.session.room_name.clone());
        room.player_count = 1;
        self.local_player.is_master = true;
        self.master = Some(self.local_player.actor);
        self.scene.set_room_state(true, true);

        self.callbacks
            .emit(&RoomCreatedEvent { room: room.clone() })
            .await?;
        self.callbacks
            .emit(&RoomJoinedEvent {
                room,
                local_actor: self.local_player.actor,
            })
            .await?;

        self.ownership.register(NetworkedObject::instantiated(
            AVATAR_VIEW,
            self.local_player.actor,
            OwnershipPolicy::Request,
        ))?;
        if let Some(peer) = self.driver.peer_mut() {
            peer.track_object(AVATAR_VIEW, SyncMode::ReliableDeltaCompressed);
        }

        let mut spawn = RpcCall::new(
            AVATAR_VIEW,
            "SpawnAvatar",
            self.local_player.actor,
            RpcFanout::AllBuffered,
        );
        spawn.args = json!({ "nickname": self.local_player.nickname });
        self.send_rpc(spawn)?;
        Ok(())
    }

    /// Leaves the room and unhooks every handler.
    pub async fn stop_session(&mut self) {
        let room_name = self.config.session.room_name.clone();
        let reverted = self
            .ownership
            .on_player_left(self.local_player.actor, self.master);
        let dropped = self.rpc_buffer.on_player_left(self.local_player.actor);
        debug!("Released {} objects and {} buffered RPCs", reverted.len(), dropped);

        if let Err(e) = self
            .callbacks
            .emit(&PlayerLeftEvent {
                player: self.local_player.clone(),
            })
            .await
        {
            warn!("⚠️ Failed to notify player leave: {}", e);
        }
        if let Err(e) = self.callbacks.emit(&RoomLeftEvent { room_name }).await {
            warn!("⚠️ Failed to notify room leave: {}", e);
        }

        self.scene.set_room_state(false, false);
        self.master = None;
        self.connect_method = None;
        if self.loading_scene.take().is_some() {
            self.driver.gate().set_running(true);
        }

        let subscriptions = std::mem::take(&mut self.app_subscriptions);
        self.callbacks.unsubscribe_all(&subscriptions).await;
        self.driver.disable(&self.callbacks).await;
    }

    /// Resolves `call` and hands it to the peer.
    pub fn send_rpc(&mut self, call: RpcCall) -> Result<(), Box<dyn std::error::Error>> {
        let plan = RpcRouter::plan(&call, self.master)?;

        if plan.execute_now {
            debug!("Executing RPC {} locally", call.method);
        }
        if plan.remote != RemoteTargets::None {
            let command = json!({
                "type": "rpc",
                "targets": serde_json::to_value(plan.remote)?,
                "call": serde_json::to_value(&call)?,
            });
            match self.driver.peer_mut() {
                Some(peer) => peer.queue_command(command),
                None => warn!("⚠️ No peer attached, RPC {} dropped", call.method),
            }
        }
        if plan.buffered {
            self.rpc_buffer.record(call);
        }
        Ok(())
    }

    /// One host frame: scene loading, fixed updates, then the late update.
    ///
    /// A scene load takes one whole frame. The message queue gate is closed
    /// for that frame and reopened when the load completes at the start of
    /// the next one.
    pub async fn frame(&mut self, elapsed_ms: f64) -> TickReport {
        self.frames += 1;
        let time_scale = self.config.host.time_scale;

        if let Some(scene_name) = self.loading_scene.take() {
            self.driver.on_scene_loaded(&scene_name);
            self.driver.gate().set_running(true);
            info!("🎬 Scene '{}' ready", scene_name);
        }

        if let Some(scene_name) = self.loader.take_pending() {
            // Inbound state must not reach objects of the scene being replaced
            self.driver.gate().set_running(false);
            info!("🎬 Loading scene '{}'", scene_name);
            self.loading_scene = Some(scene_name);
        }

        if let Some(peer) = self.driver.peer_mut() {
            peer.mark_changed(AVATAR_VIEW);
        }

        let steps = self.stepper.advance(elapsed_ms, time_scale);
        for _ in 0..steps {
            self.driver.fixed_update();
        }

        self.queue_property_updates();
        let report = self.driver.late_update(time_scale);
        self.handle_delivered().await;
        report
    }

    fn queue_property_updates(&mut self) {
        let updates = self.scene.take_outgoing_property_updates();
        if updates.is_empty() {
            return;
        }
        let Some(peer) = self.driver.peer_mut() else {
            return;
        };
        for changed in updates {
            peer.queue_command(json!({ "type": "room_properties", "changed": changed }));
        }
        // Property changes go out with the next send pass
        self.driver.send_signal().request();
    }

    async fn handle_delivered(&mut self) {
        let delivered = match self.driver.peer_mut() {
            Some(peer) => peer.take_delivered(),
            None => return,
        };

        for message in delivered {
            match message.get("type").and_then(Value::as_str) {
                Some("room_properties") => {
                    let Some(changed) = message.get("changed").and_then(Value::as_object) else {
                        continue;
                    };
                    self.scene.merge_room_properties(changed);
                    let event = RoomPropertiesChangedEvent {
                        changed: changed.clone(),
                    };
                    if let Err(e) = self.callbacks.emit(&event).await {
                        warn!("⚠️ Room property notification failed: {}", e);
                    }
                }
                Some("rpc") => {
                    if let Some(method) = message.pointer("/call/method").and_then(Value::as_str) {
                        debug!("RPC {} echoed back", method);
                    }
                }
                _ => {}
            }
        }
    }

    async fn subscribe_app_handlers(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.app_subscriptions.push(
            self.callbacks
                .on(|event: RoomJoinedEvent| {
                    info!("🏠 Joined room '{}' as {}", event.room.name, event.local_actor);
                    Ok(())
                })
                .await?,
        );
        self.app_subscriptions.push(
            self.callbacks
                .on(|event: PlayerJoinedEvent| {
                    info!("👋 {} entered the room", event.player.nickname);
                    Ok(())
                })
                .await?,
        );
        self.app_subscriptions.push(
            self.callbacks
                .on(|event: RoomLeftEvent| {
                    info!("🚪 Left room '{}'", event.room_name);
                    Ok(())
                })
                .await?,
        );
        Ok(())
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!(
            "  📤 Send rate: {}/s (max {} datagrams per frame)",
            self.config.driver.send_rate, self.config.driver.max_datagrams
        );
        info!(
            "  🔁 Serialization rate: {}/s",
            self.config.driver.serialization_rate
        );
        info!(
            "  🖼️ Frame interval: {} ms, fixed step: {} ms, time scale: {}",
            self.config.host.frame_interval_ms,
            self.config.host.fixed_timestep_ms,
            self.config.host.time_scale
        );
        info!(
            "  🎬 Scene: {} (auto sync: {})",
            self.config.session.scene_name, self.config.session.auto_sync_scene
        );
    }

    async fn log_statistics(&self) {
        let stats = self.driver.stats();
        let callback_stats = self.callbacks.get_stats().await;
        info!("📊 Statistics after {} frames:", self.frames);
        info!(
            "  - Fixed/late updates: {}/{}",
            stats.fixed_updates, stats.late_updates
        );
        info!(
            "  - Batches dispatched: {} ({} capped passes)",
            stats.batches_dispatched, stats.capped_dispatches
        );
        info!(
            "  - State sync passes: {} ({} failed)",
            stats.state_sync_passes, stats.state_sync_failures
        );
        info!(
            "  - Send firings: {}, datagrams: {}",
            stats.send_firings, stats.datagrams_sent
        );
        info!(
            "  - Callbacks: {} handlers, {} events, {} failures",
            callback_stats.total_handlers,
            callback_stats.events_emitted,
            callback_stats.handler_failures
        );
        if let Some(peer) = self.driver.peer() {
            let peer_stats = peer.stats();
            info!(
                "  - Loopback: {} commands, {} datagrams, {} messages",
                peer_stats.commands_queued, peer_stats.datagrams_sent, peer_stats.messages_dispatched
            );
        }
        debug!(
            "Connected via {:?}, scene '{}'",
            self.connect_method,
            self.scene.active_scene_name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomloop_core::SceneLoader;

    fn app() -> Application {
        let mut config = AppConfig::default();
        config.session.scene_name = "Arena".to_string();
        Application::from_config(config).unwrap()
    }

    #[tokio::test]
    async fn test_session_publishes_scene_and_buffers_spawn() {
        let mut app = app();
        app.start_session().await.unwrap();

        assert!(app.driver().is_enabled());
        assert_eq!(app.scene().room_scene().as_deref(), Some("Arena"));
        assert_eq!(app.rpc_buffer().len(), 1);
        assert_eq!(app.ownership().owner_of(AVATAR_VIEW, None), Some(LOCAL_ACTOR));
        assert!(app.driver().peer().unwrap().ack_thread_running());
    }

    #[tokio::test]
    async fn test_frames_move_commands_through_loopback() {
        let mut app = app();
        app.start_session().await.unwrap();

        // First frame: sync pass and an immediate send
        let report = app.frame(20.0).await;
        assert!(report.serialized);
        assert!(report.send_fired);
        assert!(report.datagrams_sent >= 1);

        // Next frame dispatches what was looped back
        app.frame(20.0).await;
        let stats = app.driver().stats();
        assert!(stats.fixed_updates >= 2);
        assert!(stats.batches_dispatched >= 1);

        let peer = app.driver().peer().unwrap();
        assert!(peer.stats().messages_dispatched >= 1);
    }

    #[tokio::test]
    async fn test_property_echo_reaches_room_state() {
        let mut app = app();
        app.start_session().await.unwrap();

        for _ in 0..3 {
            app.frame(20.0).await;
        }
        assert_eq!(app.scene().room_scene().as_deref(), Some("Arena"));
        let stats = app.callbacks().get_stats().await;
        assert!(stats.events_emitted >= 3, "{stats:?}");
        assert!(app.scene().take_outgoing_property_updates().is_empty());
    }

    #[tokio::test]
    async fn test_stop_session_unsubscribes_everything() {
        let mut app = app();
        app.start_session().await.unwrap();
        app.stop_session().await;

        assert!(!app.driver().is_enabled());
        assert!(app.rpc_buffer().is_empty());
        assert_eq!(app.ownership().owner_of(AVATAR_VIEW, None), None);
        let stats = app.callbacks().get_stats().await;
        assert_eq!(stats.total_handlers, 0);
    }

    #[tokio::test]
    async fn test_scene_load_frame_runs_with_gate_closed() {
        let mut app = app();
        app.start_session().await.unwrap();
        app.frame(20.0).await;

        app.loader.load_scene("Dungeon");
        let batches_before = app.driver().stats().batches_dispatched;
        let report = app.frame(20.0).await;
        assert!(!app.driver().gate().is_running());
        assert_eq!(app.driver().stats().batches_dispatched, batches_before);
        assert!(!report.serialized);
        assert_eq!(report.datagrams_sent, 0);
        assert_eq!(app.scene().active_scene_name(), "Arena");

        app.frame(20.0).await;
        assert!(app.driver().gate().is_running());
        assert_eq!(app.scene().active_scene_name(), "Dungeon");
        assert!(app.driver().stats().batches_dispatched > batches_before);

        // The master publishes the scene it switched to
        app.frame(20.0).await;
        app.frame(20.0).await;
        assert_eq!(app.scene().room_scene().as_deref(), Some("Dungeon"));
    }

    #[test]
    fn test_master_only_rpc_without_master_fails() {
        let mut app = app();
        let call = RpcCall::new(AVATAR_VIEW, "Kick", LOCAL_ACTOR, RpcFanout::MasterOnly);
        assert!(app.send_rpc(call).is_err());
    }
}
