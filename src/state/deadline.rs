//! The persisted deadline and its fallback alarm, managed as one unit
//!
//! Every terminal transition of a countdown (stop, completion) must both
//! clear the persisted record and cancel the fallback alarm, otherwise a
//! stale alarm could ring for a timer that no longer exists. Dismissing the
//! alarm only clears a record whose deadline has passed, since a new
//! countdown may have been started while the previous one was ringing.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{
    error::StoreError,
    scheduler::{AlarmKey, AlarmScheduler, AlarmTier, ShowIntent},
    store::{PersistedTimer, TimerStore},
};

pub struct TimerDeadline {
    store: Arc<TimerStore>,
    scheduler: AlarmScheduler,
}

impl TimerDeadline {
    pub fn new(store: Arc<TimerStore>, scheduler: AlarmScheduler) -> Self {
        Self { store, scheduler }
    }

    pub fn load(&self) -> Result<Option<PersistedTimer>, StoreError> {
        self.store.load()
    }

    pub fn persist(&self, record: &PersistedTimer) -> Result<(), StoreError> {
        self.store.save(record)
    }

    /// Arm the fallback alarm at the record's deadline
    pub fn arm_fallback(&self, record: &PersistedTimer) -> Option<AlarmTier> {
        let show = ShowIntent::new("Focus timer");
        let tier = self.scheduler.schedule_reliable_alarm(
            AlarmKey::TimerFallback,
            record.end_time_epoch_millis,
            Some(&show),
        );
        if tier.is_none() {
            warn!("No fallback alarm armed; relying on the in-process countdown");
        }
        tier
    }

    /// Clear the persisted record and cancel the fallback alarm
    pub fn retire(&self) {
        self.scheduler.cancel(AlarmKey::TimerFallback);
        if let Err(e) = self.store.clear() {
            error!("Failed to clear persisted timer: {}", e);
        }
    }

    /// Retire unless the persisted record belongs to a countdown that is
    /// still ahead of `now_millis`. Returns whether anything was retired.
    pub fn retire_if_elapsed(&self, now_millis: i64) -> bool {
        match self.store.load() {
            Ok(Some(record)) if !record.has_elapsed(now_millis) => {
                debug!(
                    "Keeping countdown ending at {}; it has not elapsed",
                    record.end_time_epoch_millis
                );
                false
            }
            Ok(_) => {
                self.retire();
                true
            }
            Err(e) => {
                warn!("Cannot read persisted timer, leaving it in place: {}", e);
                false
            }
        }
    }
}
