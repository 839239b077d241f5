/// Room callback registry - split into registration, emission and stats
mod core;
mod emitters;
mod handlers;
mod stats;
mod tests;

pub use self::core::{CallbackRegistry, SubscriptionId};
pub use stats::CallbackStats;

use std::sync::Arc;

/// Creates a shared, empty callback registry.
pub fn create_callback_registry() -> Arc<CallbackRegistry> {
    Arc::new(CallbackRegistry::new())
}
