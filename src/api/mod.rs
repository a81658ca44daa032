//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/start", post(timer_start_handler))
        .route("/timer/stop", post(timer_stop_handler))
        .route("/alarm/dismiss", post(alarm_dismiss_handler))
        .route("/reminders", get(reminders_list_handler).post(reminder_schedule_handler))
        .route("/reminders/:habit_id", delete(reminder_cancel_handler))
        // Platform signals, injected by the host integration
        .route("/system/boot", post(boot_handler))
        .route("/system/package-replaced", post(package_replaced_handler))
        .route("/system/task-removed", post(task_removed_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
