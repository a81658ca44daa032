//! Persisted mirror of the running countdown

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{read_json, remove_file, write_json_atomic};
use crate::error::StoreError;

/// The durable timer record. Always written and cleared as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTimer {
    /// Absolute deadline in epoch milliseconds
    #[serde(rename = "timer_end_time")]
    pub end_time_epoch_millis: i64,
    /// Requested duration in milliseconds
    #[serde(rename = "timer_duration")]
    pub duration_millis: i64,
    /// Epoch milliseconds at which the timer was started
    #[serde(rename = "timer_start_time")]
    pub start_time_epoch_millis: i64,
}

impl PersistedTimer {
    pub fn starting_at(now_millis: i64, duration_millis: i64) -> Self {
        Self {
            end_time_epoch_millis: now_millis + duration_millis,
            duration_millis,
            start_time_epoch_millis: now_millis,
        }
    }

    /// Milliseconds left at `now_millis`; zero or negative once elapsed
    pub fn remaining_millis(&self, now_millis: i64) -> i64 {
        self.end_time_epoch_millis - now_millis
    }

    pub fn has_elapsed(&self, now_millis: i64) -> bool {
        now_millis >= self.end_time_epoch_millis
    }
}

/// Single-record file store for the timer deadline (last writer wins)
#[derive(Debug)]
pub struct TimerStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted deadline.
    ///
    /// A malformed record cannot be trusted to describe a deadline, so it is
    /// logged and reported as absent.
    pub fn load(&self) -> Result<Option<PersistedTimer>, StoreError> {
        match read_json::<PersistedTimer>(&self.path) {
            Ok(record) => Ok(record),
            Err(StoreError::Json { path, source }) => {
                warn!("Ignoring malformed timer record at {}: {}", path.display(), source);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, record: &PersistedTimer) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Lock("timer store"))?;
        write_json_atomic(&self.path, record)?;
        debug!("Persisted timer deadline {}", record.end_time_epoch_millis);
        Ok(())
    }

    /// Remove the record. Idempotent.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Lock("timer store"))?;
        remove_file(&self.path)?;
        debug!("Cleared persisted timer record");
        Ok(())
    }
}
