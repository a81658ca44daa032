//! Re-arms habit reminders after a restart
//!
//! Backend alarms do not survive a reboot (or, for the in-process backend,
//! a daemon restart). On boot the registry is replayed against the habit
//! store; if the registry is empty the habit store is scanned instead.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::services::ReminderService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaySource {
    Registry,
    HabitScan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub source: ReplaySource,
    /// Habits whose reminder is armed again
    pub rearmed: Vec<i64>,
    /// Stale registry entries removed
    pub pruned: Vec<i64>,
    /// Habits that could not be re-armed
    pub failed: Vec<i64>,
}

impl ReplayReport {
    fn new(source: ReplaySource) -> Self {
        Self {
            source,
            rearmed: Vec::new(),
            pruned: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct BootRescheduler {
    reminders: Arc<ReminderService>,
}

impl BootRescheduler {
    pub fn new(reminders: Arc<ReminderService>) -> Self {
        Self { reminders }
    }

    /// Replay every reminder, one habit at a time
    pub fn replay(&self) -> ReplayReport {
        let entries = match self.reminders.registry().list_all() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Reminder registry unreadable, scanning habits instead: {}", e);
                Vec::new()
            }
        };

        let report = if entries.is_empty() {
            self.replay_from_habits()
        } else {
            let mut report = ReplayReport::new(ReplaySource::Registry);
            for entry in entries {
                match self.reminders.habits().get(entry.habit_id) {
                    Ok(Some(habit)) => match habit.reminder_time() {
                        Some((hour, minute)) => self.rearm(&mut report, habit.id, hour, minute),
                        None => self.prune(&mut report, entry.habit_id),
                    },
                    Ok(None) => self.prune(&mut report, entry.habit_id),
                    Err(e) => {
                        // The registry exists to work without the record store
                        warn!(
                            "Habit store unavailable for habit {}, using registered time: {}",
                            entry.habit_id, e
                        );
                        self.rearm(&mut report, entry.habit_id, entry.hour, entry.minute);
                    }
                }
            }
            report
        };

        info!(
            "Reminder replay from {:?}: {} re-armed, {} pruned, {} failed",
            report.source,
            report.rearmed.len(),
            report.pruned.len(),
            report.failed.len()
        );
        report
    }

    fn replay_from_habits(&self) -> ReplayReport {
        let mut report = ReplayReport::new(ReplaySource::HabitScan);
        let habits = match self.reminders.habits().active_with_reminders() {
            Ok(habits) => habits,
            Err(e) => {
                warn!("Could not scan habits for reminders: {}", e);
                return report;
            }
        };

        for habit in habits {
            if let Some((hour, minute)) = habit.reminder_time() {
                self.rearm(&mut report, habit.id, hour, minute);
            }
        }
        report
    }

    fn rearm(&self, report: &mut ReplayReport, habit_id: i64, hour: u32, minute: u32) {
        match self.reminders.schedule_reminder(habit_id, hour, minute) {
            Ok(Some(_)) => report.rearmed.push(habit_id),
            Ok(None) => report.failed.push(habit_id),
            Err(e) => {
                warn!("Failed to re-arm reminder for habit {}: {}", habit_id, e);
                report.failed.push(habit_id);
            }
        }
    }

    fn prune(&self, report: &mut ReplayReport, habit_id: i64) {
        debug!("Habit {} no longer wants a reminder, pruning", habit_id);
        match self.reminders.cancel_reminder(habit_id) {
            Ok(_) => report.pruned.push(habit_id),
            Err(e) => {
                warn!("Failed to prune reminder for habit {}: {}", habit_id, e);
                report.failed.push(habit_id);
            }
        }
    }
}
