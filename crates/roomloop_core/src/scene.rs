//! Scene synchronization between the master client and everyone else.
//!
//! When automatic scene sync is on, the master client publishes the name of
//! its active scene in a room property and every other client loads that scene
//! when the property changes. The update driver only triggers the two checks;
//! the policy lives behind [`SceneSession`].

use crate::types::PropertyTable;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Room property key holding the synced scene name.
pub const CURRENT_SCENE_PROPERTY: &str = "curScn";

/// Session/scene layer the event forwarder delegates to.
pub trait SceneSession: Send + Sync + Debug {
    /// Name of the scene currently loaded by the host engine.
    fn active_scene_name(&self) -> String;

    /// Publishes `level` as the room's scene if this client is allowed to.
    fn set_level_in_props_if_synced(&self, level: &str);

    /// Loads the room's scene if it differs from the active one.
    fn load_level_if_synced(&self);

    /// Called by the host after any scene finished loading, including loads
    /// the session did not request.
    fn new_scene_loaded(&self, scene_name: &str);
}

/// Host hook that actually loads scenes.
pub trait SceneLoader: Send + Sync + Debug {
    fn load_scene(&self, name: &str);
}

#[derive(Debug, Default)]
struct SceneState {
    auto_sync: bool,
    in_room: bool,
    is_master: bool,
    active_scene: String,
    loading: Option<String>,
    room_properties: PropertyTable,
    outgoing: Vec<PropertyTable>,
}

/// In-memory [`SceneSession`] implementing automatic scene sync.
///
/// Property writes made by the master are queued in an outbox the host sends
/// to the server with its next property update.
#[derive(Debug)]
pub struct SyncedSceneSession {
    state: Mutex<SceneState>,
    loader: Arc<dyn SceneLoader>,
}

impl SyncedSceneSession {
    pub fn new(active_scene: impl Into<String>, auto_sync: bool, loader: Arc<dyn SceneLoader>) -> Self {
        Self {
            state: Mutex::new(SceneState {
                auto_sync,
                active_scene: active_scene.into(),
                ..SceneState::default()
            }),
            loader,
        }
    }

    fn state(&self) -> MutexGuard<'_, SceneState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_auto_sync(&self, enabled: bool) {
        self.state().auto_sync = enabled;
    }

    /// Records whether this client is in a room and whether it is master.
    pub fn set_room_state(&self, in_room: bool, is_master: bool) {
        let mut state = self.state();
        state.in_room = in_room;
        state.is_master = is_master && in_room;
        if !in_room {
            state.room_properties.clear();
        }
    }

    /// Applies a property change received from the server.
    pub fn merge_room_properties(&self, changed: &PropertyTable) {
        let mut state = self.state();
        for (key, value) in changed {
            if value.is_null() {
                state.room_properties.remove(key);
            } else {
                state.room_properties.insert(key.clone(), value.clone());
            }
        }
    }

    /// Scene name currently published in the room, if any.
    pub fn room_scene(&self) -> Option<String> {
        self.state()
            .room_properties
            .get(CURRENT_SCENE_PROPERTY)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Drains the property updates waiting to be sent to the server.
    pub fn take_outgoing_property_updates(&self) -> Vec<PropertyTable> {
        std::mem::take(&mut self.state().outgoing)
    }
}

impl SceneSession for SyncedSceneSession {
    fn active_scene_name(&self) -> String {
        self.state().active_scene.clone()
    }

    fn set_level_in_props_if_synced(&self, level: &str) {
        let mut state = self.state();
        if !state.auto_sync || !state.in_room || !state.is_master {
            return;
        }

        let current = state
            .room_properties
            .get(CURRENT_SCENE_PROPERTY)
            .and_then(Value::as_str);
        if current == Some(level) {
            return;
        }

        let mut update = PropertyTable::new();
        update.insert(CURRENT_SCENE_PROPERTY.to_string(), Value::from(level));
        state
            .room_properties
            .insert(CURRENT_SCENE_PROPERTY.to_string(), Value::from(level));
        state.outgoing.push(update);
        info!("🎬 Published scene '{}' to room properties", level);
    }

    fn load_level_if_synced(&self) {
        let target = {
            let mut state = self.state();
            if !state.auto_sync || !state.in_room || state.is_master {
                return;
            }
            let Some(scene) = state
                .room_properties
                .get(CURRENT_SCENE_PROPERTY)
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                return;
            };
            if scene == state.active_scene || state.loading.as_deref() == Some(scene.as_str()) {
                return;
            }
            state.loading = Some(scene.clone());
            scene
        };

        info!("🎬 Loading synced scene '{}'", target);
        self.loader.load_scene(&target);
    }

    fn new_scene_loaded(&self, scene_name: &str) {
        {
            let mut state = self.state();
            state.loading = None;
            state.active_scene = scene_name.to_string();
            debug!("Scene '{}' loaded", scene_name);
        }
        // A master that switched scenes on its own publishes the new one
        self.set_level_in_props_if_synced(scene_name);
    }
}

/// Loader that only remembers what it was asked to load.
#[derive(Debug, Default)]
pub struct RecordingSceneLoader {
    requests: Mutex<Vec<String>>,
}

impl RecordingSceneLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SceneLoader for RecordingSceneLoader {
    fn load_scene(&self, name: &str) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(name.to_string());
    }
}
