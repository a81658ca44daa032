//! Timer state structure and management

use serde::{Deserialize, Serialize};

/// Snapshot of the countdown as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub is_running: bool,
    pub is_alarm_ringing: bool,
    /// Absolute deadline while running
    pub end_time_epoch_millis: Option<i64>,
    pub remaining_seconds: Option<u64>,
}

impl TimerState {
    /// Create an idle timer state
    pub fn idle() -> Self {
        Self {
            is_running: false,
            is_alarm_ringing: false,
            end_time_epoch_millis: None,
            remaining_seconds: None,
        }
    }

    /// Create a running timer state; remaining time rounds up to whole seconds
    pub fn running(end_time_epoch_millis: i64, remaining_millis: i64) -> Self {
        Self {
            is_running: true,
            is_alarm_ringing: false,
            end_time_epoch_millis: Some(end_time_epoch_millis),
            remaining_seconds: Some(((remaining_millis.max(0) + 999) / 1000) as u64),
        }
    }

    /// Same state with the ringing flag overlaid
    pub fn with_ringing(mut self, ringing: bool) -> Self {
        self.is_alarm_ringing = ringing;
        self
    }

    pub fn is_idle(&self) -> bool {
        !self.is_running && !self.is_alarm_ringing
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Lifecycle signals for live observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Started { end_time_epoch_millis: i64 },
    Resumed { end_time_epoch_millis: i64, remaining_millis: i64 },
    Stopped,
    Completed { end_time_epoch_millis: i64 },
}
