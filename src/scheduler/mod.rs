//! Alarm scheduling with tiered fallback
//!
//! The in-process countdown is the primary delivery path; alarms armed here
//! are a safety net. Scheduling is therefore best-effort: every failure is
//! logged and absorbed, and callers learn only which tier (if any) took.

pub mod backend;

pub use backend::TokioAlarmBackend;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ScheduleError;

/// Identifies a pending alarm. Re-arming the same key replaces the old alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "habit_id", rename_all = "snake_case")]
pub enum AlarmKey {
    /// Backup for the running countdown, armed at its deadline
    TimerFallback,
    /// Daily reminder for one habit
    HabitReminder(i64),
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmKey::TimerFallback => write!(f, "timer-fallback"),
            AlarmKey::HabitReminder(id) => write!(f, "habit-reminder-{}", id),
        }
    }
}

/// Which kind of alarm was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmTier {
    /// Fires at the exact instant, even while idle. Needs permission.
    Exact,
    /// User-visible alarm-clock entry, exempt from the permission
    AlarmClock,
    /// Deferrable alarm that may still fire while idle
    InexactAllowWhileIdle,
    /// Plain deferrable alarm
    Inexact,
}

/// Something the platform can present to the user as the pending alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowIntent {
    pub label: String,
}

impl ShowIntent {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

/// The platform alarm service
pub trait AlarmBackend: Send + Sync {
    /// Whether exact alarms are currently permitted
    fn can_schedule_exact_alarms(&self) -> bool;

    /// Whether deferrable alarms may be allowed to fire while idle
    fn supports_idle_alarms(&self) -> bool {
        true
    }

    fn set_exact_and_allow_while_idle(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError>;

    fn set_alarm_clock(&self, key: AlarmKey, trigger_at_millis: i64, show: &ShowIntent) -> Result<(), ScheduleError>;

    fn set_and_allow_while_idle(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError>;

    fn set(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError>;

    /// Unregister the pending alarm for `key`, if any
    fn cancel(&self, key: AlarmKey);
}

/// Arms alarms on a backend using the best tier available
#[derive(Clone)]
pub struct AlarmScheduler {
    backend: Arc<dyn AlarmBackend>,
}

impl AlarmScheduler {
    pub fn new(backend: Arc<dyn AlarmBackend>) -> Self {
        Self { backend }
    }

    /// Arm `key` at `trigger_at_millis`.
    ///
    /// Tries exact, then alarm clock (only with a `show` intent), then
    /// inexact. Never fails; returns the tier armed, or `None` if every tier
    /// was refused.
    pub fn schedule_reliable_alarm(
        &self,
        key: AlarmKey,
        trigger_at_millis: i64,
        show: Option<&ShowIntent>,
    ) -> Option<AlarmTier> {
        if self.backend.can_schedule_exact_alarms() {
            match self.backend.set_exact_and_allow_while_idle(key, trigger_at_millis) {
                Ok(()) => return self.armed(key, AlarmTier::Exact),
                Err(e) => warn!("Exact alarm for {} refused, falling back: {}", key, e),
            }
        } else {
            debug!("No exact alarm permission for {}", key);
        }

        if let Some(show) = show {
            match self.backend.set_alarm_clock(key, trigger_at_millis, show) {
                Ok(()) => return self.armed(key, AlarmTier::AlarmClock),
                Err(e) => warn!("Alarm clock for {} refused, falling back: {}", key, e),
            }
        }

        let (tier, result) = if self.backend.supports_idle_alarms() {
            (
                AlarmTier::InexactAllowWhileIdle,
                self.backend.set_and_allow_while_idle(key, trigger_at_millis),
            )
        } else {
            (AlarmTier::Inexact, self.backend.set(key, trigger_at_millis))
        };

        match result {
            Ok(()) => self.armed(key, tier),
            Err(e) => {
                warn!("Could not arm any alarm for {}: {}", key, e);
                None
            }
        }
    }

    pub fn cancel(&self, key: AlarmKey) {
        debug!("Cancelling alarm {}", key);
        self.backend.cancel(key);
    }

    fn armed(&self, key: AlarmKey, tier: AlarmTier) -> Option<AlarmTier> {
        info!("Armed {} using {:?} tier", key, tier);
        Some(tier)
    }
}
