/// Frame-driven update driver - configuration, tick logic and stats
mod config;
mod core;
mod stats;

pub use self::core::{DispatchReport, TickReport, UpdateDriver};
pub use config::DriverConfig;
pub use stats::DriverStats;
