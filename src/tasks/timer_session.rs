//! Timer session manager
//!
//! Owns the single countdown. The persisted absolute deadline is the source
//! of truth: the tick loop recomputes remaining time from it on every tick,
//! and a restarted process resumes (or completes) from it.
//!
//! ```text
//!          start_timer            deadline reached
//!  Idle ──────────────► Running ──────────────────► Completed ─► Idle (alarm rings)
//!   ▲                     │
//!   └──── stop_timer ─────┘
//! ```

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    error::TimerError,
    services::{
        platform::{Notification, NotificationId, Notifier},
        AlarmRingingService,
    },
    state::{TimerDeadline, TimerEvent, TimerState},
    store::PersistedTimer,
};

const TICK: Duration = Duration::from_secs(1);

/// What [`TimerSessionManager::restore`] found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    NothingPersisted,
    AlreadyRunning,
    /// Deadline still ahead; countdown resumed
    Resumed { remaining_millis: i64 },
    /// Deadline passed while the process was down; alarm handed off
    ElapsedWhileDown { overdue_millis: i64 },
}

struct Countdown {
    generation: u64,
    record: PersistedTimer,
    handle: JoinHandle<()>,
}

pub struct TimerSessionManager {
    clock: Arc<dyn Clock>,
    deadline: Arc<TimerDeadline>,
    ringing: Arc<AlarmRingingService>,
    notifier: Arc<dyn Notifier>,
    reassurance_for: Duration,
    countdown: Mutex<Option<Countdown>>,
    next_generation: AtomicU64,
    state_tx: watch::Sender<TimerState>,
    events_tx: broadcast::Sender<TimerEvent>,
}

impl TimerSessionManager {
    pub fn new(
        clock: Arc<dyn Clock>,
        deadline: Arc<TimerDeadline>,
        ringing: Arc<AlarmRingingService>,
        notifier: Arc<dyn Notifier>,
        reassurance_for: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(TimerState::idle());
        let (events_tx, _) = broadcast::channel(16);
        Self {
            clock,
            deadline,
            ringing,
            notifier,
            reassurance_for,
            countdown: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            state_tx,
            events_tx,
        }
    }

    /// Current countdown state (without the ringing overlay)
    pub fn state(&self) -> TimerState {
        *self.state_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.lock_countdown().is_some()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.events_tx.subscribe()
    }

    /// Start a countdown of `duration_seconds`. A no-op while one is running.
    ///
    /// The deadline is persisted before anything else; if that fails the
    /// timer is not started.
    pub fn start_timer(self: &Arc<Self>, duration_seconds: u64) -> Result<TimerState, TimerError> {
        if duration_seconds == 0 {
            return Err(TimerError::InvalidDuration);
        }

        let mut slot = self.lock_countdown();
        if slot.is_some() {
            debug!("Timer already running, ignoring start");
            return Ok(self.state());
        }

        let duration_millis = (duration_seconds as i64).saturating_mul(1000);
        let record = PersistedTimer::starting_at(self.clock.now_millis(), duration_millis);
        self.deadline.persist(&record)?;

        info!(
            "Starting {}s timer, deadline {}",
            duration_seconds, record.end_time_epoch_millis
        );
        self.deadline.arm_fallback(&record);
        self.launch(&mut slot, record);
        drop(slot);

        self.emit(TimerEvent::Started {
            end_time_epoch_millis: record.end_time_epoch_millis,
        });
        Ok(self.state())
    }

    /// Stop the countdown and clean up. Returns whether one was running.
    pub fn stop_timer(&self) -> bool {
        let stopped = self.lock_countdown().take();
        if let Some(countdown) = &stopped {
            countdown.handle.abort();
            info!("Timer stopped");
        } else {
            debug!("No timer running, cleaning up anyway");
        }

        self.deadline.retire();
        self.notifier.cancel(NotificationId::Countdown);
        self.state_tx.send_replace(TimerState::idle());

        if stopped.is_some() {
            self.emit(TimerEvent::Stopped);
        }
        stopped.is_some()
    }

    /// Pick up a countdown persisted by an earlier process
    pub fn restore(self: &Arc<Self>) -> RestoreOutcome {
        let mut slot = self.lock_countdown();
        if slot.is_some() {
            return RestoreOutcome::AlreadyRunning;
        }

        let record = match self.deadline.load() {
            Ok(Some(record)) => record,
            Ok(None) => return RestoreOutcome::NothingPersisted,
            Err(e) => {
                error!("Could not read persisted timer: {}", e);
                return RestoreOutcome::NothingPersisted;
            }
        };

        let now = self.clock.now_millis();
        if record.has_elapsed(now) {
            drop(slot);
            let overdue_millis = now - record.end_time_epoch_millis;
            info!("Timer elapsed {}ms ago while not running, ringing now", overdue_millis);
            self.finish(record);
            return RestoreOutcome::ElapsedWhileDown { overdue_millis };
        }

        let remaining_millis = record.remaining_millis(now);
        info!("Resuming timer with {}ms remaining", remaining_millis);
        // Backend alarms may not have survived; re-arming the same key is idempotent
        self.deadline.arm_fallback(&record);
        self.launch(&mut slot, record);
        drop(slot);

        self.emit(TimerEvent::Resumed {
            end_time_epoch_millis: record.end_time_epoch_millis,
            remaining_millis,
        });
        RestoreOutcome::Resumed { remaining_millis }
    }

    /// The host removed our task while a countdown may be running.
    ///
    /// Shows a short-lived notice that the timer continues. The countdown
    /// itself is untouched. Returns whether the notice was shown.
    pub fn on_task_removed(&self) -> bool {
        if !self.is_running() {
            return false;
        }

        if let Err(e) = self.notifier.post(&Notification::still_running()) {
            warn!("Failed to show still-running notice: {}", e);
            return false;
        }

        let notifier = Arc::clone(&self.notifier);
        let after = self.reassurance_for;
        tokio::spawn(async move {
            sleep(after).await;
            notifier.cancel(NotificationId::Reassurance);
        });
        true
    }

    fn launch(self: &Arc<Self>, slot: &mut Option<Countdown>, record: PersistedTimer) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            manager.run_countdown(generation, record).await;
        });

        let remaining = record.remaining_millis(self.clock.now_millis());
        self.state_tx
            .send_replace(TimerState::running(record.end_time_epoch_millis, remaining));
        *slot = Some(Countdown {
            generation,
            record,
            handle,
        });
    }

    async fn run_countdown(self: Arc<Self>, generation: u64, record: PersistedTimer) {
        loop {
            let remaining = record.remaining_millis(self.clock.now_millis());
            if remaining <= 0 {
                self.complete(generation);
                return;
            }

            self.state_tx
                .send_replace(TimerState::running(record.end_time_epoch_millis, remaining));
            if let Err(e) = self.notifier.post(&Notification::countdown(remaining)) {
                debug!("Countdown notification update failed: {}", e);
            }

            // Land exactly on the deadline instead of overshooting by a tick
            sleep(TICK.min(Duration::from_millis(remaining as u64))).await;
        }
    }

    fn complete(&self, generation: u64) {
        let finished = {
            let mut slot = self.lock_countdown();
            match slot.as_ref() {
                Some(countdown) if countdown.generation == generation => slot.take(),
                _ => None,
            }
        };

        // Stopped or superseded while the last tick was in flight
        let Some(countdown) = finished else {
            return;
        };

        info!("Timer finished");
        self.finish(countdown.record);
    }

    fn finish(&self, record: PersistedTimer) {
        // The fallback alarm is redundant now that this path has fired
        self.deadline.retire();
        self.notifier.cancel(NotificationId::Countdown);
        self.state_tx.send_replace(TimerState::idle());
        self.emit(TimerEvent::Completed {
            end_time_epoch_millis: record.end_time_epoch_millis,
        });
        self.ringing.start_alarm();
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn lock_countdown(&self) -> std::sync::MutexGuard<'_, Option<Countdown>> {
        self.countdown.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
