//! In-process alarm backend on tokio timers

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use super::{AlarmBackend, AlarmKey, AlarmTier, ShowIntent};
use crate::{clock::Clock, error::ScheduleError};

#[derive(Debug)]
struct PendingAlarm {
    generation: u64,
    trigger_at_millis: i64,
    tier: AlarmTier,
    show: Option<ShowIntent>,
    handle: JoinHandle<()>,
}

/// A pending alarm as reported to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarmInfo {
    pub key: AlarmKey,
    pub trigger_at_millis: i64,
    pub tier: AlarmTier,
    pub show: Option<ShowIntent>,
}

/// Alarm backend that arms one tokio task per key.
///
/// Fired keys are delivered on the channel returned by [`TokioAlarmBackend::new`].
/// Pending alarms live in process memory only, so they disappear on restart
/// and must be re-armed from persisted state.
pub struct TokioAlarmBackend {
    clock: Arc<dyn Clock>,
    exact_permitted: AtomicBool,
    inexact_slack: Duration,
    fired_tx: mpsc::UnboundedSender<AlarmKey>,
    pending: Arc<Mutex<HashMap<AlarmKey, PendingAlarm>>>,
    next_generation: AtomicU64,
}

impl TokioAlarmBackend {
    pub fn new(
        clock: Arc<dyn Clock>,
        exact_permitted: bool,
        inexact_slack: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AlarmKey>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let backend = Self {
            clock,
            exact_permitted: AtomicBool::new(exact_permitted),
            inexact_slack,
            fired_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        };
        (backend, fired_rx)
    }

    /// Grant or revoke exact alarm permission at runtime
    pub fn set_exact_permitted(&self, permitted: bool) {
        self.exact_permitted.store(permitted, Ordering::SeqCst);
    }

    pub fn is_armed(&self, key: AlarmKey) -> bool {
        self.pending.lock().map(|p| p.contains_key(&key)).unwrap_or(false)
    }

    pub fn pending(&self) -> Vec<PendingAlarmInfo> {
        let Ok(pending) = self.pending.lock() else {
            return Vec::new();
        };
        let mut alarms: Vec<PendingAlarmInfo> = pending
            .iter()
            .map(|(key, alarm)| PendingAlarmInfo {
                key: *key,
                trigger_at_millis: alarm.trigger_at_millis,
                tier: alarm.tier,
                show: alarm.show.clone(),
            })
            .collect();
        alarms.sort_by_key(|alarm| (alarm.trigger_at_millis, alarm.key));
        alarms
    }

    /// The earliest user-visible alarm-clock entry
    pub fn next_alarm_clock(&self) -> Option<PendingAlarmInfo> {
        self.pending()
            .into_iter()
            .find(|alarm| alarm.tier == AlarmTier::AlarmClock)
    }

    fn arm(
        &self,
        key: AlarmKey,
        trigger_at_millis: i64,
        tier: AlarmTier,
        show: Option<ShowIntent>,
    ) -> Result<(), ScheduleError> {
        let fires_at = match tier {
            AlarmTier::Exact | AlarmTier::AlarmClock => trigger_at_millis,
            AlarmTier::InexactAllowWhileIdle | AlarmTier::Inexact => {
                trigger_at_millis + self.inexact_slack.as_millis() as i64
            }
        };
        let delay = Duration::from_millis((fires_at - self.clock.now_millis()).max(0) as u64);
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);

        let mut pending = self
            .pending
            .lock()
            .map_err(|_| ScheduleError::Unavailable("alarm table poisoned".to_string()))?;

        let pending_map = Arc::clone(&self.pending);
        let fired_tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;

            // A replaced or cancelled alarm must not fire
            let still_current = match pending_map.lock() {
                Ok(mut pending) => match pending.get(&key) {
                    Some(alarm) if alarm.generation == generation => {
                        pending.remove(&key);
                        true
                    }
                    _ => false,
                },
                Err(_) => false,
            };

            if still_current {
                info!("Alarm {} fired", key);
                if fired_tx.send(key).is_err() {
                    warn!("No receiver for fired alarm {}", key);
                }
            }
        });

        if let Some(previous) = pending.insert(
            key,
            PendingAlarm {
                generation,
                trigger_at_millis,
                tier,
                show,
                handle,
            },
        ) {
            debug!("Replacing pending alarm {}", key);
            previous.handle.abort();
        }

        Ok(())
    }
}

impl AlarmBackend for TokioAlarmBackend {
    fn can_schedule_exact_alarms(&self) -> bool {
        self.exact_permitted.load(Ordering::SeqCst)
    }

    fn set_exact_and_allow_while_idle(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError> {
        if !self.can_schedule_exact_alarms() {
            return Err(ScheduleError::PermissionDenied);
        }
        self.arm(key, trigger_at_millis, AlarmTier::Exact, None)
    }

    fn set_alarm_clock(&self, key: AlarmKey, trigger_at_millis: i64, show: &ShowIntent) -> Result<(), ScheduleError> {
        self.arm(key, trigger_at_millis, AlarmTier::AlarmClock, Some(show.clone()))
    }

    fn set_and_allow_while_idle(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError> {
        self.arm(key, trigger_at_millis, AlarmTier::InexactAllowWhileIdle, None)
    }

    fn set(&self, key: AlarmKey, trigger_at_millis: i64) -> Result<(), ScheduleError> {
        self.arm(key, trigger_at_millis, AlarmTier::Inexact, None)
    }

    fn cancel(&self, key: AlarmKey) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(alarm) = pending.remove(&key) {
                alarm.handle.abort();
                debug!("Cancelled pending alarm {}", key);
            }
        }
    }
}

impl Drop for TokioAlarmBackend {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, alarm) in pending.drain() {
                alarm.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;

    const T0: i64 = 1_700_000_000_000;

    fn backend(exact: bool) -> (TokioAlarmBackend, mpsc::UnboundedReceiver<AlarmKey>) {
        TokioAlarmBackend::new(Arc::new(TokioClock::anchored_at(T0)), exact, Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn exact_alarm_fires_at_deadline() {
        let (backend, mut fired) = backend(true);
        backend
            .set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0 + 5_000)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert!(fired.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.recv().await, Some(AlarmKey::TimerFallback));
        assert!(!backend.is_armed(AlarmKey::TimerFallback));
    }

    #[tokio::test(start_paused = true)]
    async fn exact_alarm_requires_permission() {
        let (backend, _fired) = backend(false);
        assert_eq!(
            backend.set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0),
            Err(ScheduleError::PermissionDenied)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn inexact_alarm_is_deferred_by_slack() {
        let (backend, mut fired) = backend(false);
        backend.set_and_allow_while_idle(AlarmKey::HabitReminder(1), T0 + 1_000).unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fired.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(1_001)).await;
        assert_eq!(fired.recv().await, Some(AlarmKey::HabitReminder(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_alarm() {
        let (backend, mut fired) = backend(true);
        backend.set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0 + 1_000).unwrap();
        backend.set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0 + 10_000).unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.try_recv().is_err());
        assert_eq!(backend.pending().len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.recv().await, Some(AlarmKey::TimerFallback));
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_alarm_never_fires() {
        let (backend, mut fired) = backend(true);
        backend.set_exact_and_allow_while_idle(AlarmKey::TimerFallback, T0 + 1_000).unwrap();
        backend.cancel(AlarmKey::TimerFallback);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_clock_entries_are_visible() {
        let (backend, _fired) = backend(false);
        backend
            .set_alarm_clock(AlarmKey::TimerFallback, T0 + 60_000, &ShowIntent::new("Focus timer"))
            .unwrap();

        let next = backend.next_alarm_clock().unwrap();
        assert_eq!(next.key, AlarmKey::TimerFallback);
        assert_eq!(next.trigger_at_millis, T0 + 60_000);
        assert_eq!(next.show.unwrap().label, "Focus timer");
    }
}
