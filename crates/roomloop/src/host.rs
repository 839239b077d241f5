//! Pieces of the simulated host engine: fixed-step timing and scene loading.

use roomloop_core::SceneLoader;
use std::sync::Mutex;
use tracing::info;

/// Most fixed updates run in a single frame; the rest of a long stall is
/// dropped instead of replayed.
pub const MAX_FIXED_STEPS_PER_FRAME: u32 = 8;

/// Converts frame time into a number of fixed-step callbacks.
#[derive(Debug, Clone)]
pub struct FrameStepper {
    step_ms: f64,
    accumulated_ms: f64,
}

impl FrameStepper {
    pub fn new(fixed_timestep_ms: u64) -> Self {
        Self {
            step_ms: fixed_timestep_ms.max(1) as f64,
            accumulated_ms: 0.0,
        }
    }

    /// Adds `elapsed_ms` of real time scaled by `time_scale` and returns how
    /// many fixed updates are due.
    pub fn advance(&mut self, elapsed_ms: f64, time_scale: f32) -> u32 {
        self.accumulated_ms += elapsed_ms.max(0.0) * f64::from(time_scale.max(0.0));

        let mut steps = 0;
        while self.accumulated_ms >= self.step_ms && steps < MAX_FIXED_STEPS_PER_FRAME {
            self.accumulated_ms -= self.step_ms;
            steps += 1;
        }
        if steps == MAX_FIXED_STEPS_PER_FRAME {
            self.accumulated_ms = self.accumulated_ms.min(self.step_ms);
        }
        steps
    }
}

/// Scene loader that defers the actual load to the next host frame.
#[derive(Debug, Default)]
pub struct HostSceneLoader {
    pending: Mutex<Option<String>>,
}

impl HostSceneLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the scene requested since the last frame, if any.
    pub fn take_pending(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl SceneLoader for HostSceneLoader {
    fn load_scene(&self, name: &str) {
        info!("🎬 Scene '{}' queued for loading", name);
        *self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(name.to_string());
    }
}
