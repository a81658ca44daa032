//! Focus Alarm - a focus-timer daemon with redundant alarm delivery
//!
//! One countdown at a time, persisted as an absolute deadline so it survives
//! restarts. When it ends, the alarm is delivered by whichever of two paths
//! gets there first: the in-process countdown or a backup alarm armed at the
//! same deadline. Habit reminders are tracked in a registry so they can be
//! re-armed after a restart.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
