//! Platform events and the commands they map to
//!
//! Inbound platform callbacks (boot, fired alarms, task removal, dismiss
//! actions) are translated into commands by a pure function so the glue stays
//! thin and the mapping can be tested without any side effects.

use serde::{Deserialize, Serialize};

use crate::{scheduler::AlarmKey, services::DismissReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    BootCompleted,
    PackageReplaced,
    AlarmFired { key: AlarmKey },
    TaskRemoved,
    DismissRequested,
}

/// What the rest of the system looked like when the event arrived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub timer_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Resume or complete a countdown persisted before the restart
    RestoreTimer,
    ReplayReminders,
    StartRinging,
    StopRinging { reason: DismissReason },
    FireHabitReminder { habit_id: i64 },
    ShowStillRunning,
}

/// Map an event to the commands that handle it
pub fn plan(event: PlatformEvent, snapshot: Snapshot) -> Vec<Command> {
    match event {
        PlatformEvent::BootCompleted | PlatformEvent::PackageReplaced => {
            vec![Command::RestoreTimer, Command::ReplayReminders]
        }
        // The fallback path rings regardless of the countdown's fate
        PlatformEvent::AlarmFired {
            key: AlarmKey::TimerFallback,
        } => vec![Command::StartRinging],
        PlatformEvent::AlarmFired {
            key: AlarmKey::HabitReminder(habit_id),
        } => vec![Command::FireHabitReminder { habit_id }],
        PlatformEvent::TaskRemoved if snapshot.timer_running => vec![Command::ShowStillRunning],
        PlatformEvent::TaskRemoved => Vec::new(),
        PlatformEvent::DismissRequested => vec![Command::StopRinging {
            reason: DismissReason::User,
        }],
    }
}
