//! Executes platform events against the pipeline

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{boot_rescheduler::ReplayReport, timer_session::RestoreOutcome};
use crate::{
    events::{plan, Command, PlatformEvent, Snapshot},
    scheduler::AlarmKey,
    services::{platform::NotificationAction, ReminderFired},
    state::AppState,
};

/// Result of one executed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    TimerRestored { outcome: String },
    RemindersReplayed { report: ReplayReport },
    Ringing { started: bool },
    RingingStopped { stopped: bool },
    HabitReminder { outcome: Option<ReminderFired> },
    StillRunningShown { shown: bool },
}

/// Plan and execute one platform event
pub fn dispatch(state: &Arc<AppState>, event: PlatformEvent) -> Vec<CommandResult> {
    let snapshot = Snapshot {
        timer_running: state.timer.is_running(),
    };
    let commands = plan(event, snapshot);
    debug!("Event {:?} planned as {:?}", event, commands);

    commands
        .into_iter()
        .map(|command| execute(state, command))
        .collect()
}

fn execute(state: &Arc<AppState>, command: Command) -> CommandResult {
    match command {
        Command::RestoreTimer => {
            let outcome = state.timer.restore();
            if outcome != RestoreOutcome::NothingPersisted {
                info!("Timer restore: {:?}", outcome);
            }
            CommandResult::TimerRestored {
                outcome: format!("{:?}", outcome),
            }
        }
        Command::ReplayReminders => CommandResult::RemindersReplayed {
            report: state.rescheduler.replay(),
        },
        Command::StartRinging => CommandResult::Ringing {
            started: state.ringing.start_alarm(),
        },
        Command::StopRinging { reason } => CommandResult::RingingStopped {
            stopped: state.ringing.stop_alarm(reason),
        },
        Command::FireHabitReminder { habit_id } => {
            let outcome = match state.reminders.on_reminder_fired(habit_id) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("Reminder for habit {} failed: {}", habit_id, e);
                    None
                }
            };
            CommandResult::HabitReminder { outcome }
        }
        Command::ShowStillRunning => CommandResult::StillRunningShown {
            shown: state.timer.on_task_removed(),
        },
    }
}

/// Background task that turns fired backend alarms into platform events
pub async fn alarm_receiver_task(state: Arc<AppState>, mut fired_rx: mpsc::UnboundedReceiver<AlarmKey>) {
    info!("Starting alarm receiver task");

    while let Some(key) = fired_rx.recv().await {
        dispatch(&state, PlatformEvent::AlarmFired { key });
    }

    info!("Alarm backend closed, alarm receiver task exiting");
}

/// Background task that runs actions clicked on desktop notifications
pub async fn notification_action_task(
    state: Arc<AppState>,
    mut actions_rx: mpsc::UnboundedReceiver<NotificationAction>,
) {
    while let Some(action) = actions_rx.recv().await {
        match action {
            NotificationAction::StopTimer => {
                state.record_action("notification-stop");
                state.timer.stop_timer();
            }
            NotificationAction::DismissAlarm => {
                state.record_action("notification-dismiss");
                dispatch(&state, PlatformEvent::DismissRequested);
            }
        }
    }

    debug!("Notification action channel closed");
}
