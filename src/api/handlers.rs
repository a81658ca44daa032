//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use super::responses::{
    ApiResponse, EventResponse, HealthResponse, PendingAlarmResponse, ReminderResponse, RemindersResponse,
    ScheduleReminderRequest, StartTimerRequest, StatusResponse,
};
use crate::{
    error::{ReminderError, TimerError},
    events::PlatformEvent,
    services::DismissReason,
    state::AppState,
    store::ReminderEntry,
    tasks::dispatch,
};

/// Handle POST /timer/start - Start a countdown
pub async fn timer_start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartTimerRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    if state.timer.is_running() {
        return Ok(Json(ApiResponse::unchanged(
            "Timer already running".to_string(),
            state.get_timer_state(),
        )));
    }

    match state.timer.start_timer(request.duration_seconds) {
        Ok(_) => {
            state.record_action("timer-start");
            info!("Timer start endpoint called - {}s countdown", request.duration_seconds);
            Ok(Json(ApiResponse::ok(
                format!("Timer started for {}s", request.duration_seconds),
                state.get_timer_state(),
            )))
        }
        Err(TimerError::InvalidDuration) => {
            warn!("Rejected timer start with zero duration");
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e) => {
            error!("Failed to start timer: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timer/stop - Stop the countdown
pub async fn timer_stop_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let stopped = state.timer.stop_timer();
    state.record_action("timer-stop");
    let message = if stopped { "Timer stopped" } else { "No timer was running" };
    info!("Timer stop endpoint called - {}", message);
    Json(ApiResponse::ok(message.to_string(), state.get_timer_state()))
}

/// Handle POST /alarm/dismiss - Silence the ringing alarm
pub async fn alarm_dismiss_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let stopped = state.ringing.stop_alarm(DismissReason::User);
    state.record_action("alarm-dismiss");
    if stopped {
        info!("Alarm dismissed by user");
        Json(ApiResponse::ok("Alarm dismissed".to_string(), state.get_timer_state()))
    } else {
        Json(ApiResponse::unchanged(
            "No alarm was ringing".to_string(),
            state.get_timer_state(),
        ))
    }
}

/// Handle GET /status - Return current timer and alarm status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();
    let pending_alarms = state
        .alarm_backend
        .pending()
        .into_iter()
        .map(|alarm| PendingAlarmResponse {
            key: alarm.key,
            trigger_at: alarm.trigger_at_millis,
            tier: alarm.tier,
        })
        .collect();

    Json(StatusResponse {
        timer: state.get_timer_state(),
        next_alarm_clock: state
            .alarm_backend
            .next_alarm_clock()
            .map(|alarm| alarm.trigger_at_millis),
        pending_alarms,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /reminders - List registered reminders
pub async fn reminders_list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RemindersResponse>, StatusCode> {
    match state.reminders.registry().list_all() {
        Ok(reminders) => Ok(Json(RemindersResponse { reminders })),
        Err(e) => {
            error!("Failed to read reminder registry: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /reminders - Schedule a habit reminder
pub async fn reminder_schedule_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScheduleReminderRequest>,
) -> Result<Json<ReminderResponse>, StatusCode> {
    let entry = ReminderEntry::new(request.habit_id, request.hour, request.minute).map_err(|e| {
        warn!("Rejected reminder: {}", e);
        StatusCode::UNPROCESSABLE_ENTITY
    })?;

    match state
        .reminders
        .schedule_reminder(entry.habit_id, entry.hour, entry.minute)
    {
        Ok(tier) => {
            state.record_action("reminder-schedule");
            info!(
                "Reminder for habit {} scheduled at {:02}:{:02}",
                entry.habit_id, entry.hour, entry.minute
            );
            Ok(Json(ReminderResponse { entry, tier }))
        }
        Err(ReminderError::InvalidTime { .. }) => Err(StatusCode::UNPROCESSABLE_ENTITY),
        Err(e) => {
            error!("Failed to schedule reminder for habit {}: {}", entry.habit_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle DELETE /reminders/:habit_id - Cancel a habit reminder
pub async fn reminder_cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(habit_id): Path<i64>,
) -> Result<StatusCode, StatusCode> {
    match state.reminders.cancel_reminder(habit_id) {
        Ok(true) => {
            state.record_action("reminder-cancel");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to cancel reminder for habit {}: {}", habit_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /system/boot
pub async fn boot_handler(State(state): State<Arc<AppState>>) -> Result<Json<EventResponse>, StatusCode> {
    run_event(state, PlatformEvent::BootCompleted, "boot_completed").await
}

/// Handle POST /system/package-replaced
pub async fn package_replaced_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EventResponse>, StatusCode> {
    run_event(state, PlatformEvent::PackageReplaced, "package_replaced").await
}

/// Handle POST /system/task-removed
pub async fn task_removed_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EventResponse>, StatusCode> {
    run_event(state, PlatformEvent::TaskRemoved, "task_removed").await
}

/// Replays touch the timer file, the registry and the habit store, so they
/// run on the blocking pool instead of an async worker.
async fn run_event(
    state: Arc<AppState>,
    event: PlatformEvent,
    name: &'static str,
) -> Result<Json<EventResponse>, StatusCode> {
    info!("Platform event received: {}", name);
    state.record_action(name);
    let results = tokio::task::spawn_blocking(move || dispatch(&state, event))
        .await
        .map_err(|e| {
            error!("Platform event {} failed: {}", name, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(EventResponse {
        event: name.to_string(),
        results,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
