//! Focus Alarm - a focus-timer daemon with redundant alarm delivery
//!
//! This is the main entry point for the focus-alarm daemon.

use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tracing::{info, warn};

use focus_alarm::{
    api::create_router,
    clock::SystemClock,
    config::Config,
    events::PlatformEvent,
    services::{
        check_inhibit_available, platform::{Notifier, WakeLock}, CommandPlayer, DesktopNotifier,
        LogNotifier, LogVibrator, NoWakeLock, SystemdInhibitLock,
    },
    state::{AppState, Platform},
    store::JsonHabitStore,
    tasks::{alarm_receiver_task, dispatch, notification_action_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_alarm={},tower_http=info", config.log_level()))
        .init();

    info!("Starting focus-alarm daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, data_dir={}, exact_alarms={}",
        config.host,
        config.port,
        config.data_dir().display(),
        !config.no_exact_alarms
    );

    // Wake locks need systemd-inhibit; ring without one rather than refuse to start
    let wake_lock: Arc<dyn WakeLock> = match check_inhibit_available().await {
        Ok(()) => Arc::new(SystemdInhibitLock::new("focus-alarm", "Alarm ringing")),
        Err(e) => {
            warn!("{}", e);
            Arc::new(NoWakeLock)
        }
    };

    // Buttons on desktop notifications feed back into the pipeline
    let (actions_tx, actions_rx) = mpsc::unbounded_channel();
    let notifier: Arc<dyn Notifier> = if config.headless {
        Arc::new(LogNotifier)
    } else {
        Arc::new(DesktopNotifier::new("Focus Alarm").with_actions(actions_tx))
    };

    let audio = CommandPlayer::new(config.sound_file.clone());
    match audio.sound_file() {
        Some(file) => info!("Alarm sound: {}", file.display()),
        None => warn!("No alarm sound found; alarms will only notify and vibrate"),
    }

    let platform = Platform {
        clock: Arc::new(SystemClock),
        notifier,
        audio: Arc::new(audio),
        vibrator: Arc::new(LogVibrator),
        wake_lock,
        habits: Arc::new(JsonHabitStore::new(config.habits_path())),
    };

    let (state, fired_rx) = AppState::new(config.app_settings(), platform);

    // Deliver fired backend alarms
    let receiver_state = Arc::clone(&state);
    tokio::spawn(async move {
        alarm_receiver_task(receiver_state, fired_rx).await;
    });

    tokio::spawn(notification_action_task(Arc::clone(&state), actions_rx));

    // Backend alarms are process-scoped, so every start is a boot: restore the
    // countdown and re-arm reminders
    let boot_state = Arc::clone(&state);
    tokio::task::spawn_blocking(move || {
        dispatch(&boot_state, PlatformEvent::BootCompleted);
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timer/start        - Start a countdown");
    info!("  POST   /timer/stop         - Stop the countdown");
    info!("  POST   /alarm/dismiss      - Dismiss the ringing alarm");
    info!("  GET    /reminders          - List habit reminders");
    info!("  POST   /reminders          - Schedule a habit reminder");
    info!("  DELETE /reminders/:id      - Cancel a habit reminder");
    info!("  POST   /system/{{boot,package-replaced,task-removed}}");
    info!("  GET    /status             - Timer and alarm status");
    info!("  GET    /health             - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        result = shutdown_signal(Arc::clone(&state)) => {
            match result {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => tracing::error!("Signal handling failed: {}", e),
            }
        }
    }

    // The persisted deadline stays on disk so the next start can resume it
    if state.timer.is_running() {
        info!("Timer still running; it will resume on next start");
    }

    info!("Server shutdown complete");
    Ok(())
}
