//! Alarm ringing service
//!
//! Plays the alarm once a countdown has finished. Two independent paths can
//! ask it to ring (the countdown itself and the fallback alarm), so
//! [`AlarmRingingService::start_alarm`] is a compare-and-set: the first
//! caller rings, later callers are no-ops until the alarm is stopped.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, PoisonError, Weak,
    },
    time::Duration,
};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, error, info, warn};

use super::{
    platform::{AudioPlayer, Notification, NotificationId, Notifier, OutputHandle, Vibrator, WakeLock},
    vibrator::ALARM_PATTERN,
};
use crate::{clock::Clock, state::TimerDeadline};

/// Outputs the ringing service drives
#[derive(Clone)]
pub struct RingingOutputs {
    pub notifier: Arc<dyn Notifier>,
    pub audio: Arc<dyn AudioPlayer>,
    pub vibrator: Arc<dyn Vibrator>,
    pub wake_lock: Arc<dyn WakeLock>,
}

#[derive(Debug, Clone, Copy)]
pub struct RingingConfig {
    /// Hard ceiling on the wake lock
    pub wake_lock_ceiling: Duration,
    /// An undismissed alarm stops itself after this long
    pub auto_dismiss_after: Duration,
}

impl Default for RingingConfig {
    fn default() -> Self {
        Self {
            wake_lock_ceiling: Duration::from_secs(10 * 60),
            auto_dismiss_after: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    User,
    AutoDismiss,
    External,
}

/// Handles held while ringing, released together
struct RingingSession {
    id: u64,
    playback: Option<Box<dyn OutputHandle>>,
    vibration: Option<Box<dyn OutputHandle>>,
    wake_lock: Option<Box<dyn OutputHandle>>,
    auto_dismiss: Option<JoinHandle<()>>,
}

impl RingingSession {
    fn release(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.release();
        }
        if let Some(mut vibration) = self.vibration.take() {
            vibration.release();
        }
        if let Some(mut wake_lock) = self.wake_lock.take() {
            wake_lock.release();
        }
        if let Some(task) = self.auto_dismiss.take() {
            task.abort();
        }
    }
}

impl Drop for RingingSession {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct AlarmRingingService {
    outputs: RingingOutputs,
    config: RingingConfig,
    deadline: Arc<TimerDeadline>,
    clock: Arc<dyn Clock>,
    is_ringing: AtomicBool,
    session: Mutex<Option<RingingSession>>,
    next_session_id: AtomicU64,
    ringing_tx: watch::Sender<bool>,
}

impl AlarmRingingService {
    pub fn new(
        outputs: RingingOutputs,
        config: RingingConfig,
        deadline: Arc<TimerDeadline>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (ringing_tx, _) = watch::channel(false);
        Self {
            outputs,
            config,
            deadline,
            clock,
            is_ringing: AtomicBool::new(false),
            session: Mutex::new(None),
            next_session_id: AtomicU64::new(1),
            ringing_tx,
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.is_ringing.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ringing_tx.subscribe()
    }

    /// Start ringing. Returns `false` if an alarm was already ringing.
    pub fn start_alarm(self: &Arc<Self>) -> bool {
        let mut slot = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if self
            .is_ringing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Alarm already ringing, ignoring duplicate start");
            return false;
        }

        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        info!("Alarm ringing (session {})", id);

        let wake_lock = match self.outputs.wake_lock.acquire(self.config.wake_lock_ceiling) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Ringing without wake lock: {}", e);
                None
            }
        };

        if let Err(e) = self.outputs.notifier.post(&Notification::alarm()) {
            error!("Failed to show alarm notification: {}", e);
        }

        let playback = match self.outputs.audio.play_looping() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Alarm sound unavailable, continuing with vibration: {}", e);
                None
            }
        };

        let vibration = match self.outputs.vibrator.vibrate_repeating(&ALARM_PATTERN) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Vibration unavailable: {}", e);
                None
            }
        };

        let auto_dismiss = self.spawn_auto_dismiss(id);

        *slot = Some(RingingSession {
            id,
            playback,
            vibration,
            wake_lock,
            auto_dismiss: Some(auto_dismiss),
        });
        drop(slot);

        self.ringing_tx.send_replace(true);
        true
    }

    /// Stop ringing and release everything. Returns `false` if nothing was ringing.
    pub fn stop_alarm(&self, reason: DismissReason) -> bool {
        self.stop_session(None, reason)
    }

    fn stop_session(&self, only_id: Option<u64>, reason: DismissReason) -> bool {
        let mut slot = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let (Some(wanted), Some(current)) = (only_id, slot.as_ref()) {
            if current.id != wanted {
                return false;
            }
        }

        let Some(mut session) = slot.take() else {
            debug!("No alarm ringing, nothing to stop");
            return false;
        };

        session.release();
        // A countdown started while ringing keeps its record and fallback
        self.deadline.retire_if_elapsed(self.clock.now_millis());
        self.outputs.notifier.cancel(NotificationId::Alarm);
        self.is_ringing.store(false, Ordering::SeqCst);
        drop(slot);

        self.ringing_tx.send_replace(false);
        info!("Alarm stopped ({:?})", reason);
        true
    }

    fn spawn_auto_dismiss(self: &Arc<Self>, session_id: u64) -> JoinHandle<()> {
        let service: Weak<Self> = Arc::downgrade(self);
        let after = self.config.auto_dismiss_after;
        tokio::spawn(async move {
            sleep(after).await;
            if let Some(service) = service.upgrade() {
                info!("Alarm not dismissed after {}s, stopping it", after.as_secs());
                service.stop_session(Some(session_id), DismissReason::AutoDismiss);
            }
        })
    }
}
