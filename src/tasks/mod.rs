//! Background tasks module
//!
//! The countdown, the boot-time reminder replay, and the dispatcher that
//! runs platform events (including fired alarms) against the pipeline.

pub mod boot_rescheduler;
pub mod dispatcher;
pub mod timer_session;

// Re-export main types
pub use boot_rescheduler::{BootRescheduler, ReplayReport, ReplaySource};
pub use dispatcher::{alarm_receiver_task, dispatch, notification_action_task, CommandResult};
pub use timer_session::{RestoreOutcome, TimerSessionManager};
