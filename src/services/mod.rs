//! Services module
//!
//! The ringing and reminder services, plus the host outputs they drive:
//! notifications, alarm audio, vibration and wake locks.

pub mod audio;
pub mod notifier;
pub mod platform;
pub mod reminders;
pub mod ringing;
pub mod system;
pub mod vibrator;
pub mod wake_lock;

// Re-export main types
pub use audio::CommandPlayer;
pub use notifier::{DesktopNotifier, LogNotifier};
pub use reminders::{next_occurrence, ReminderFired, ReminderService};
pub use ringing::{AlarmRingingService, DismissReason, RingingConfig, RingingOutputs};
pub use system::check_inhibit_available;
pub use vibrator::LogVibrator;
pub use wake_lock::{NoWakeLock, SystemdInhibitLock};
