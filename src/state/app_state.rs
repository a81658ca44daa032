//! Main application state: wires the alarm pipeline together

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::{TimerDeadline, TimerState};
use crate::{
    clock::Clock,
    scheduler::{AlarmKey, AlarmScheduler, TokioAlarmBackend},
    services::{
        platform::{AudioPlayer, Notifier, Vibrator, WakeLock},
        AlarmRingingService, ReminderService, RingingConfig, RingingOutputs,
    },
    store::{HabitSource, ReminderRegistry, TimerStore},
    tasks::{BootRescheduler, TimerSessionManager},
};

/// Tunables and file locations
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub port: u16,
    pub host: String,
    pub timer_path: PathBuf,
    pub registry_path: PathBuf,
    pub exact_alarms: bool,
    pub inexact_slack: Duration,
    pub ringing: RingingConfig,
    pub reassurance_for: Duration,
}

/// Host integrations the pipeline talks to
#[derive(Clone)]
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn Notifier>,
    pub audio: Arc<dyn AudioPlayer>,
    pub vibrator: Arc<dyn Vibrator>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub habits: Arc<dyn HabitSource>,
}

pub struct AppState {
    pub timer: Arc<TimerSessionManager>,
    pub ringing: Arc<AlarmRingingService>,
    pub reminders: Arc<ReminderService>,
    pub rescheduler: BootRescheduler,
    pub alarm_backend: Arc<TokioAlarmBackend>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    /// Build the pipeline. The receiver yields keys of fired backend alarms
    /// and must be drained by the dispatcher.
    pub fn new(settings: AppSettings, platform: Platform) -> (Arc<Self>, mpsc::UnboundedReceiver<AlarmKey>) {
        let (backend, fired_rx) = TokioAlarmBackend::new(
            Arc::clone(&platform.clock),
            settings.exact_alarms,
            settings.inexact_slack,
        );
        let alarm_backend = Arc::new(backend);
        let scheduler = AlarmScheduler::new(alarm_backend.clone());

        let deadline = Arc::new(TimerDeadline::new(
            Arc::new(TimerStore::new(settings.timer_path)),
            scheduler.clone(),
        ));

        let ringing = Arc::new(AlarmRingingService::new(
            RingingOutputs {
                notifier: Arc::clone(&platform.notifier),
                audio: platform.audio,
                vibrator: platform.vibrator,
                wake_lock: platform.wake_lock,
            },
            settings.ringing,
            Arc::clone(&deadline),
            Arc::clone(&platform.clock),
        ));

        let timer = Arc::new(TimerSessionManager::new(
            Arc::clone(&platform.clock),
            deadline,
            Arc::clone(&ringing),
            Arc::clone(&platform.notifier),
            settings.reassurance_for,
        ));

        let reminders = Arc::new(ReminderService::new(
            platform.clock,
            scheduler,
            Arc::new(ReminderRegistry::new(settings.registry_path)),
            platform.habits,
            platform.notifier,
        ));

        let state = Self {
            timer,
            ringing,
            rescheduler: BootRescheduler::new(Arc::clone(&reminders)),
            reminders,
            alarm_backend,
            start_time: Instant::now(),
            port: settings.port,
            host: settings.host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        };
        (Arc::new(state), fired_rx)
    }

    /// Countdown state with the ringing flag overlaid
    pub fn get_timer_state(&self) -> TimerState {
        self.timer.state().with_ringing(self.ringing.is_ringing())
    }

    /// Record the last action served
    pub fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
