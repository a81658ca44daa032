//! Interfaces onto the platform's user-facing outputs
//!
//! Notifications, audio, vibration and wake locks are reached only through
//! these traits so the alarm logic can run against desktop implementations
//! in the daemon and against recording doubles in tests.

use std::{fmt, time::Duration};

use serde::Serialize;

use crate::error::PlatformError;

/// Notification channels, each with its own priority and sound settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Silent ongoing countdown
    Countdown,
    /// Ringing alarm: max priority, full screen
    Alarm,
    /// Short-lived "timer still running" notice
    Reassurance,
    /// Daily habit reminders
    HabitReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub name: &'static str,
    pub importance: Importance,
    pub sound: bool,
    pub vibration: bool,
}

impl Channel {
    pub fn config(self) -> ChannelConfig {
        match self {
            Channel::Countdown => ChannelConfig {
                name: "Focus timer",
                importance: Importance::Low,
                sound: false,
                vibration: false,
            },
            // The ringing service drives sound and vibration itself
            Channel::Alarm => ChannelConfig {
                name: "Timer alarm",
                importance: Importance::Max,
                sound: false,
                vibration: false,
            },
            Channel::Reassurance => ChannelConfig {
                name: "Timer status",
                importance: Importance::High,
                sound: false,
                vibration: true,
            },
            Channel::HabitReminder => ChannelConfig {
                name: "Habit reminders",
                importance: Importance::Default,
                sound: true,
                vibration: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationId {
    Countdown,
    Alarm,
    Reassurance,
    Habit(i64),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationId::Countdown => write!(f, "countdown"),
            NotificationId::Alarm => write!(f, "alarm"),
            NotificationId::Reassurance => write!(f, "reassurance"),
            NotificationId::Habit(id) => write!(f, "habit-{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    StopTimer,
    DismissAlarm,
}

impl NotificationAction {
    /// Identifier sent back by the notification server when clicked
    pub fn key(self) -> &'static str {
        match self {
            NotificationAction::StopTimer => "stop_timer",
            NotificationAction::DismissAlarm => "dismiss_alarm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NotificationAction::StopTimer => "Stop",
            NotificationAction::DismissAlarm => "Dismiss",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        [NotificationAction::StopTimer, NotificationAction::DismissAlarm]
            .into_iter()
            .find(|action| action.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    pub actions: Vec<NotificationAction>,
    /// Cannot be swiped away by the user
    pub ongoing: bool,
    pub full_screen: bool,
}

impl Notification {
    pub fn countdown(remaining_millis: i64) -> Self {
        Self {
            id: NotificationId::Countdown,
            channel: Channel::Countdown,
            title: "Focus timer".to_string(),
            body: format!("{} remaining", format_remaining(remaining_millis)),
            actions: vec![NotificationAction::StopTimer],
            ongoing: true,
            full_screen: false,
        }
    }

    pub fn alarm() -> Self {
        Self {
            id: NotificationId::Alarm,
            channel: Channel::Alarm,
            title: "Time's up!".to_string(),
            body: "Your focus session has finished.".to_string(),
            actions: vec![NotificationAction::DismissAlarm],
            ongoing: true,
            full_screen: true,
        }
    }

    pub fn still_running() -> Self {
        Self {
            id: NotificationId::Reassurance,
            channel: Channel::Reassurance,
            title: "Timer still running".to_string(),
            body: "Your focus timer keeps counting in the background.".to_string(),
            actions: Vec::new(),
            ongoing: false,
            full_screen: false,
        }
    }

    pub fn habit_reminder(habit_id: i64, habit_name: &str) -> Self {
        Self {
            id: NotificationId::Habit(habit_id),
            channel: Channel::HabitReminder,
            title: "Habit reminder".to_string(),
            body: format!("Time for: {}", habit_name),
            actions: Vec::new(),
            ongoing: false,
            full_screen: false,
        }
    }
}

/// `mm:ss`, or `h:mm:ss` from one hour up. Rounds partial seconds up.
pub fn format_remaining(remaining_millis: i64) -> String {
    let total = (remaining_millis.max(0) + 999) / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

pub trait Notifier: Send + Sync {
    /// Post or replace the notification with `notification.id`
    fn post(&self, notification: &Notification) -> Result<(), PlatformError>;

    fn cancel(&self, id: NotificationId);
}

/// A running output (playback, vibration, wake lock). Released at most once;
/// implementations also release on drop.
pub trait OutputHandle: Send {
    fn release(&mut self);
}

pub trait AudioPlayer: Send + Sync {
    /// Start the alarm sound looping at full volume
    fn play_looping(&self) -> Result<Box<dyn OutputHandle>, PlatformError>;
}

pub trait Vibrator: Send + Sync {
    /// Repeat `pattern` (alternating wait/vibrate) until released
    fn vibrate_repeating(&self, pattern: &[Duration]) -> Result<Box<dyn OutputHandle>, PlatformError>;
}

pub trait WakeLock: Send + Sync {
    /// Keep the device awake for at most `timeout`
    fn acquire(&self, timeout: Duration) -> Result<Box<dyn OutputHandle>, PlatformError>;
}
