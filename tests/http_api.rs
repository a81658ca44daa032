// HTTP surface, driven through the router without binding a socket.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::{advance, habit, Harness, T0};
use focus_alarm::{create_router, store::PersistedTimer};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test(start_paused = true)]
async fn timer_start_stop_round() {
    let h = Harness::new();
    let app = create_router(h.state.clone());

    let (status, body) = call(&app, Method::POST, "/timer/start", Some(json!({"duration_seconds": 1500}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["is_running"], true);
    assert_eq!(body["timer"]["end_time_epoch_millis"], T0 + 1_500_000);

    let (_, body) = call(&app, Method::POST, "/timer/start", Some(json!({"duration_seconds": 60}))).await;
    assert_eq!(body["status"], "unchanged");

    let (status, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending_alarms"][0]["key"]["kind"], "timer_fallback");
    assert_eq!(body["last_action"], "timer-start");

    let (status, body) = call(&app, Method::POST, "/timer/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["is_running"], false);
    assert!(h.persisted().is_none());
}

#[tokio::test(start_paused = true)]
async fn zero_duration_is_unprocessable() {
    let h = Harness::new();
    let app = create_router(h.state.clone());
    let (status, _) = call(&app, Method::POST, "/timer/start", Some(json!({"duration_seconds": 0}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test(start_paused = true)]
async fn dismiss_endpoint_silences_alarm() {
    let h = Harness::new();
    let app = create_router(h.state.clone());

    let (_, body) = call(&app, Method::POST, "/alarm/dismiss", None).await;
    assert_eq!(body["status"], "unchanged");

    h.state.timer.start_timer(2).unwrap();
    advance(2_001).await;
    let (_, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(body["timer"]["is_alarm_ringing"], true);

    let (_, body) = call(&app, Method::POST, "/alarm/dismiss", None).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["is_alarm_ringing"], false);
}

#[tokio::test(start_paused = true)]
async fn reminder_endpoints() {
    let h = Harness::builder()
        .habits(vec![habit(3, "Meditate", true, Some((6, 30)))])
        .build();
    let app = create_router(h.state.clone());

    let (status, body) = call(
        &app,
        Method::POST,
        "/reminders",
        Some(json!({"habit_id": 3, "hour": 6, "minute": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "exact");

    let (_, body) = call(&app, Method::GET, "/reminders", None).await;
    assert_eq!(body["reminders"], json!([{"habit_id": 3, "hour": 6, "minute": 30}]));

    let (status, _) = call(
        &app,
        Method::POST,
        "/reminders",
        Some(json!({"habit_id": 3, "hour": 25, "minute": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&app, Method::DELETE, "/reminders/3", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/reminders/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn platform_event_endpoints() {
    let h = Harness::builder()
        .habits(vec![habit(1, "Read", true, Some((9, 0)))])
        .build();
    let app = create_router(h.state.clone());

    let (status, body) = call(&app, Method::POST, "/system/boot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"], "boot_completed");
    assert_eq!(body["results"][1]["result"], "reminders_replayed");
    assert_eq!(body["results"][1]["report"]["source"], "habit_scan");

    let (_, body) = call(&app, Method::POST, "/system/package-replaced", None).await;
    assert_eq!(body["results"][1]["report"]["source"], "registry");

    let (_, body) = call(&app, Method::POST, "/system/task-removed", None).await;
    assert_eq!(body["results"], json!([]));
}

#[tokio::test(start_paused = true)]
async fn boot_endpoint_resumes_countdown_that_still_rings() {
    let record = PersistedTimer::starting_at(T0 - 50_000, 60_000);
    let h = Harness::builder().persisted(record).build();
    let app = create_router(h.state.clone());

    let (status, body) = call(&app, Method::POST, "/system/boot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["result"], "timer_restored");
    assert!(h.state.timer.is_running());

    // The countdown spawned during the replay keeps running afterwards
    advance(10_001).await;
    assert!(h.state.ringing.is_ringing());
    assert_eq!(h.outputs.audio.started(), 1);
}

#[tokio::test(start_paused = true)]
async fn health_reports_version() {
    let h = Harness::new();
    let app = create_router(h.state.clone());
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
