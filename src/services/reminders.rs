//! Habit reminder scheduling
//!
//! Reminders are one-shot alarms at the next local occurrence of the habit's
//! reminder time. Each one that fires arms the following day's, and every
//! armed reminder is mirrored into the [`ReminderRegistry`].

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::platform::{Notification, Notifier};
use crate::{
    clock::Clock,
    error::ReminderError,
    scheduler::{AlarmKey, AlarmScheduler, AlarmTier},
    store::{HabitSource, ReminderEntry, ReminderRegistry},
};

/// Outcome of a reminder alarm firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReminderFired {
    /// Notification shown and the next occurrence armed
    Notified { next_trigger_millis: Option<i64> },
    /// Habit gone, inactive or without a reminder; entry removed
    Pruned,
}

pub struct ReminderService {
    clock: Arc<dyn Clock>,
    scheduler: AlarmScheduler,
    registry: Arc<ReminderRegistry>,
    habits: Arc<dyn HabitSource>,
    notifier: Arc<dyn Notifier>,
}

impl ReminderService {
    pub fn new(
        clock: Arc<dyn Clock>,
        scheduler: AlarmScheduler,
        registry: Arc<ReminderRegistry>,
        habits: Arc<dyn HabitSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            scheduler,
            registry,
            habits,
            notifier,
        }
    }

    pub fn registry(&self) -> &ReminderRegistry {
        &self.registry
    }

    pub fn habits(&self) -> &dyn HabitSource {
        self.habits.as_ref()
    }

    /// Arm the next occurrence of `hour:minute` for a habit and record it.
    ///
    /// Returns the tier armed. If no tier could be armed the registry entry
    /// is removed, since entries must only exist for armed alarms.
    pub fn schedule_reminder(&self, habit_id: i64, hour: u32, minute: u32) -> Result<Option<AlarmTier>, ReminderError> {
        Ok(self.arm(habit_id, hour, minute)?.map(|(tier, _)| tier))
    }

    fn arm(&self, habit_id: i64, hour: u32, minute: u32) -> Result<Option<(AlarmTier, i64)>, ReminderError> {
        let entry = ReminderEntry::new(habit_id, hour, minute)?;
        let trigger = next_occurrence(&Local, self.clock.now_millis(), hour, minute);

        let tier = self
            .scheduler
            .schedule_reliable_alarm(AlarmKey::HabitReminder(habit_id), trigger, None);

        match tier {
            Some(tier) => {
                self.registry.save(entry)?;
                debug!("Habit {} reminder armed for {}", habit_id, trigger);
                Ok(Some((tier, trigger)))
            }
            None => {
                warn!("Habit {} reminder could not be armed", habit_id);
                self.registry.remove(habit_id)?;
                Ok(None)
            }
        }
    }

    /// Disarm a habit's reminder. Returns whether it was registered.
    pub fn cancel_reminder(&self, habit_id: i64) -> Result<bool, ReminderError> {
        self.scheduler.cancel(AlarmKey::HabitReminder(habit_id));
        Ok(self.registry.remove(habit_id)?)
    }

    /// Handle a fired reminder alarm: notify, then arm tomorrow's
    pub fn on_reminder_fired(&self, habit_id: i64) -> Result<ReminderFired, ReminderError> {
        let habit = match self.habits.get(habit_id) {
            Ok(habit) => habit,
            Err(e) => return self.refire_from_registry(habit_id, e.into()),
        };
        let Some((habit, (hour, minute))) = habit.and_then(|h| h.reminder_time().map(|t| (h, t))) else {
            info!("Reminder fired for missing or inactive habit {}, pruning", habit_id);
            self.cancel_reminder(habit_id)?;
            return Ok(ReminderFired::Pruned);
        };

        if let Err(e) = self
            .notifier
            .post(&Notification::habit_reminder(habit.id, &habit.name))
        {
            warn!("Failed to show reminder for habit {}: {}", habit_id, e);
        }

        let next = self.arm(habit_id, hour, minute)?;
        Ok(ReminderFired::Notified {
            next_trigger_millis: next.map(|(_, trigger)| trigger),
        })
    }

    /// The habit store could not be read. Keep the chain alive from the
    /// registered time so one bad read doesn't end the daily reminder.
    fn refire_from_registry(&self, habit_id: i64, cause: ReminderError) -> Result<ReminderFired, ReminderError> {
        warn!("Habit {} unreadable ({}), re-arming from registry", habit_id, cause);
        let Some(entry) = self.registry.get(habit_id)? else {
            return Err(cause);
        };

        if let Err(e) = self
            .notifier
            .post(&Notification::habit_reminder(habit_id, "your habit"))
        {
            warn!("Failed to show reminder for habit {}: {}", habit_id, e);
        }

        let next = self.arm(habit_id, entry.hour, entry.minute)?;
        Ok(ReminderFired::Notified {
            next_trigger_millis: next.map(|(_, trigger)| trigger),
        })
    }
}

/// Epoch millis of the first `hour:minute` in `tz` strictly after `now_millis`.
///
/// The next day is found by stepping the local calendar date, not by adding
/// 24 hours, so the wall-clock time holds across DST changes. A time that
/// falls in a spring-forward gap moves to the first valid instant after it;
/// an ambiguous fall-back time resolves to its earlier occurrence.
pub fn next_occurrence<Tz: TimeZone>(tz: &Tz, now_millis: i64, hour: u32, minute: u32) -> i64 {
    const DAY_MILLIS: i64 = 24 * 3_600_000;

    let Some(now) = tz.timestamp_millis_opt(now_millis).single() else {
        return now_millis + DAY_MILLIS;
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    let mut date = now.date_naive();

    // Today, else tomorrow; a third day only if tomorrow's slot was skipped
    for _ in 0..3 {
        let trigger = resolve_local(tz, date.and_time(time));
        if trigger > now_millis {
            return trigger;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    now_millis + DAY_MILLIS
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> i64 {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => {
            // Inside a DST gap: walk forward until the wall clock exists again
            let mut candidate = local;
            for _ in 0..(24 * 4) {
                candidate += ChronoDuration::minutes(15);
                if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
                    return dt.timestamp_millis();
                }
            }
            tz.from_utc_datetime(&local).timestamp_millis()
        }
    }
}
