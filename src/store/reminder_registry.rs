//! Registry of armed habit reminders
//!
//! Backend alarms do not outlive the process, so every armed reminder is also
//! recorded here. An entry exists for a habit exactly when an alarm is armed
//! for it. The registry is a flat file keyed by habit id and is never joined
//! against the habit store transactionally; boot replay reconciles the two.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{read_json, write_json_atomic};
use crate::error::{ReminderError, StoreError};

const REGISTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEntry {
    pub habit_id: i64,
    pub hour: u32,
    pub minute: u32,
}

impl ReminderEntry {
    pub fn new(habit_id: i64, hour: u32, minute: u32) -> Result<Self, ReminderError> {
        if hour > 23 || minute > 59 {
            return Err(ReminderError::InvalidTime { hour, minute });
        }
        Ok(Self {
            habit_id,
            hour,
            minute,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    reminders: Vec<ReminderEntry>,
}

#[derive(Debug)]
pub struct ReminderRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReminderRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the entry for `entry.habit_id`
    pub fn save(&self, entry: ReminderEntry) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Lock("reminder registry"))?;
        let mut entries = self.read_entries()?;
        entries.insert(entry.habit_id, entry);
        self.write_entries(&entries)?;
        debug!(
            "Registered reminder for habit {} at {:02}:{:02}",
            entry.habit_id, entry.hour, entry.minute
        );
        Ok(())
    }

    /// Remove the entry for `habit_id`; returns whether one existed
    pub fn remove(&self, habit_id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Lock("reminder registry"))?;
        let mut entries = self.read_entries()?;
        let existed = entries.remove(&habit_id).is_some();
        if existed {
            self.write_entries(&entries)?;
            debug!("Unregistered reminder for habit {}", habit_id);
        }
        Ok(existed)
    }

    pub fn get(&self, habit_id: i64) -> Result<Option<ReminderEntry>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Lock("reminder registry"))?;
        Ok(self.read_entries()?.remove(&habit_id))
    }

    /// All entries, ordered by habit id
    pub fn list_all(&self) -> Result<Vec<ReminderEntry>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Lock("reminder registry"))?;
        Ok(self.read_entries()?.into_values().collect())
    }

    // A corrupt registry is treated as empty so boot replay falls back to
    // scanning the habit store.
    fn read_entries(&self) -> Result<BTreeMap<i64, ReminderEntry>, StoreError> {
        let file = match read_json::<RegistryFile>(&self.path) {
            Ok(Some(file)) => file,
            Ok(None) => return Ok(BTreeMap::new()),
            Err(StoreError::Json { path, source }) => {
                warn!("Reminder registry at {} is unreadable, treating as empty: {}", path.display(), source);
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e),
        };

        if file.version != REGISTRY_VERSION {
            warn!(
                "Reminder registry version {} is not {}, treating as empty",
                file.version, REGISTRY_VERSION
            );
            return Ok(BTreeMap::new());
        }

        Ok(file
            .reminders
            .into_iter()
            .map(|entry| (entry.habit_id, entry))
            .collect())
    }

    fn write_entries(&self, entries: &BTreeMap<i64, ReminderEntry>) -> Result<(), StoreError> {
        let file = RegistryFile {
            version: REGISTRY_VERSION,
            reminders: entries.values().copied().collect(),
        };
        write_json_atomic(&self.path, &file)
    }
}
