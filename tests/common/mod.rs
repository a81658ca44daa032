// Shared harness for the integration tests.
//
// Builds a full AppState against recording doubles and a clock driven by
// tokio's paused time, so deadlines minutes or hours away resolve instantly.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use focus_alarm::{
    clock::TokioClock,
    error::{PlatformError, StoreError},
    services::{
        platform::{AudioPlayer, Notification, NotificationId, Notifier, OutputHandle, Vibrator, WakeLock},
        RingingConfig,
    },
    state::{AppSettings, AppState, Platform},
    store::{Habit, HabitSource, PersistedTimer, ReminderEntry, ReminderRegistry, TimerStore},
    tasks::alarm_receiver_task,
};
use tempfile::TempDir;

/// 2023-11-14T22:13:20Z
pub const T0: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<Notification>>,
    cancelled: Mutex<Vec<NotificationId>>,
}

impl RecordingNotifier {
    pub fn posted_ids(&self) -> Vec<NotificationId> {
        self.posted.lock().unwrap().iter().map(|n| n.id).collect()
    }

    pub fn posted(&self, id: NotificationId) -> usize {
        self.posted_ids().into_iter().filter(|posted| *posted == id).count()
    }

    pub fn cancelled(&self, id: NotificationId) -> usize {
        self.cancelled.lock().unwrap().iter().filter(|c| **c == id).count()
    }

    pub fn last(&self, id: NotificationId) -> Option<Notification> {
        self.posted.lock().unwrap().iter().rev().find(|n| n.id == id).cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notification: &Notification) -> Result<(), PlatformError> {
        self.posted.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn cancel(&self, id: NotificationId) {
        self.cancelled.lock().unwrap().push(id);
    }
}

/// Counts starts and releases of one kind of output
#[derive(Default)]
pub struct OutputCounter {
    pub started: AtomicUsize,
    pub released: Arc<AtomicUsize>,
    pub fail: AtomicBool,
}

impl OutputCounter {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Currently held outputs
    pub fn active(&self) -> usize {
        self.started() - self.released()
    }

    fn start(&self, what: &'static str) -> Result<Box<dyn OutputHandle>, PlatformError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Notification(format!("{} unavailable", what)));
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountedHandle {
            released: Arc::clone(&self.released),
            done: false,
        }))
    }
}

struct CountedHandle {
    released: Arc<AtomicUsize>,
    done: bool,
}

impl OutputHandle for CountedHandle {
    fn release(&mut self) {
        if !self.done {
            self.done = true;
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for CountedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Default)]
pub struct FakeOutputs {
    pub audio: OutputCounter,
    pub vibration: OutputCounter,
    pub wake_lock: OutputCounter,
    pub wake_lock_timeouts: Mutex<Vec<Duration>>,
}

pub struct FakeAudio(pub Arc<FakeOutputs>);
pub struct FakeVibrator(pub Arc<FakeOutputs>);
pub struct FakeWakeLock(pub Arc<FakeOutputs>);

impl AudioPlayer for FakeAudio {
    fn play_looping(&self) -> Result<Box<dyn OutputHandle>, PlatformError> {
        self.0.audio.start("audio")
    }
}

impl Vibrator for FakeVibrator {
    fn vibrate_repeating(&self, _pattern: &[Duration]) -> Result<Box<dyn OutputHandle>, PlatformError> {
        self.0.vibration.start("vibrator")
    }
}

impl WakeLock for FakeWakeLock {
    fn acquire(&self, timeout: Duration) -> Result<Box<dyn OutputHandle>, PlatformError> {
        self.0.wake_lock_timeouts.lock().unwrap().push(timeout);
        self.0.wake_lock.start("wake lock")
    }
}

/// In-memory habit records that can be made to fail
#[derive(Default)]
pub struct FakeHabits {
    habits: Mutex<Vec<Habit>>,
    pub unavailable: AtomicBool,
}

impl FakeHabits {
    pub fn with(habits: Vec<Habit>) -> Self {
        Self {
            habits: Mutex::new(habits),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn deactivate(&self, habit_id: i64) {
        for habit in self.habits.lock().unwrap().iter_mut() {
            if habit.id == habit_id {
                habit.active = false;
            }
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Lock("habit database"));
        }
        Ok(())
    }
}

impl HabitSource for FakeHabits {
    fn get(&self, habit_id: i64) -> Result<Option<Habit>, StoreError> {
        self.check()?;
        Ok(self.habits.lock().unwrap().iter().find(|h| h.id == habit_id).cloned())
    }

    fn active_with_reminders(&self) -> Result<Vec<Habit>, StoreError> {
        self.check()?;
        Ok(self
            .habits
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.reminder_time().is_some())
            .cloned()
            .collect())
    }
}

pub fn habit(id: i64, name: &str, active: bool, time: Option<(u32, u32)>) -> Habit {
    Habit {
        id,
        name: name.to_string(),
        active,
        reminder_hour: time.map(|(hour, _)| hour),
        reminder_minute: time.map(|(_, minute)| minute),
    }
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub notifier: Arc<RecordingNotifier>,
    pub outputs: Arc<FakeOutputs>,
    pub habits: Arc<FakeHabits>,
    pub dir: TempDir,
}

pub struct HarnessBuilder {
    epoch: i64,
    exact_alarms: bool,
    habits: Vec<Habit>,
    persisted: Option<PersistedTimer>,
    registry: Vec<ReminderEntry>,
}

impl HarnessBuilder {
    pub fn exact_alarms(mut self, permitted: bool) -> Self {
        self.exact_alarms = permitted;
        self
    }

    pub fn habits(mut self, habits: Vec<Habit>) -> Self {
        self.habits = habits;
        self
    }

    /// A countdown left on disk by an earlier process
    pub fn persisted(mut self, record: PersistedTimer) -> Self {
        self.persisted = Some(record);
        self
    }

    pub fn registered(mut self, habit_id: i64, hour: u32, minute: u32) -> Self {
        self.registry.push(ReminderEntry::new(habit_id, hour, minute).unwrap());
        self
    }

    /// Must be called inside a paused-time runtime
    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();

        if let Some(record) = self.persisted {
            TimerStore::new(timer_path(dir.path())).save(&record).unwrap();
        }
        let registry = ReminderRegistry::new(registry_path(dir.path()));
        for entry in self.registry {
            registry.save(entry).unwrap();
        }

        let notifier = Arc::new(RecordingNotifier::default());
        let outputs = Arc::new(FakeOutputs::default());
        let habits = Arc::new(FakeHabits::with(self.habits));

        let settings = AppSettings {
            port: 0,
            host: "127.0.0.1".to_string(),
            timer_path: timer_path(dir.path()),
            registry_path: registry_path(dir.path()),
            exact_alarms: self.exact_alarms,
            inexact_slack: Duration::from_secs(30),
            ringing: RingingConfig::default(),
            reassurance_for: Duration::from_secs(8),
        };
        let platform = Platform {
            clock: Arc::new(TokioClock::anchored_at(self.epoch)),
            notifier: notifier.clone(),
            audio: Arc::new(FakeAudio(outputs.clone())),
            vibrator: Arc::new(FakeVibrator(outputs.clone())),
            wake_lock: Arc::new(FakeWakeLock(outputs.clone())),
            habits: habits.clone(),
        };

        let (state, fired_rx) = AppState::new(settings, platform);
        tokio::spawn(alarm_receiver_task(Arc::clone(&state), fired_rx));

        Harness {
            state,
            notifier,
            outputs,
            habits,
            dir,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            epoch: T0,
            exact_alarms: true,
            habits: Vec::new(),
            persisted: None,
            registry: Vec::new(),
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// What is on disk right now
    pub fn persisted(&self) -> Option<PersistedTimer> {
        TimerStore::new(timer_path(self.dir.path())).load().unwrap()
    }

    pub fn registry(&self) -> Vec<ReminderEntry> {
        ReminderRegistry::new(registry_path(self.dir.path())).list_all().unwrap()
    }
}

fn timer_path(dir: &Path) -> PathBuf {
    dir.join("timer.json")
}

fn registry_path(dir: &Path) -> PathBuf {
    dir.join("reminders.json")
}

/// Sleep in paused time, letting spawned tasks run
pub async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    settle().await;
}

/// Let spawned tasks and channel deliveries run without moving the clock
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
