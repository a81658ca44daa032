//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    scheduler::{AlarmKey, AlarmTier},
    state::TimerState,
    store::ReminderEntry,
    tasks::CommandResult,
};

#[derive(Debug, Clone, Deserialize)]
pub struct StartTimerRequest {
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleReminderRequest {
    pub habit_id: i64,
    pub hour: u32,
    pub minute: u32,
}

/// API response structure for timer and alarm actions
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerState,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: &str, message: String, timer: TimerState) -> Self {
        Self {
            status: status.to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    pub fn ok(message: String, timer: TimerState) -> Self {
        Self::new("ok", message, timer)
    }

    /// The request changed nothing
    pub fn unchanged(message: String, timer: TimerState) -> Self {
        Self::new("unchanged", message, timer)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingAlarmResponse {
    pub key: AlarmKey,
    pub trigger_at: i64,
    pub tier: AlarmTier,
}

/// Status response with timer, ringing and alarm information
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: TimerState,
    pub next_alarm_clock: Option<i64>,
    pub pending_alarms: Vec<PendingAlarmResponse>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderResponse {
    pub entry: ReminderEntry,
    pub tier: Option<AlarmTier>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemindersResponse {
    pub reminders: Vec<ReminderEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub event: String,
    pub results: Vec<CommandResult>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
