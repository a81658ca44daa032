//! Read-only view of the app's habit records

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::read_json;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub reminder_hour: Option<u32>,
    #[serde(default)]
    pub reminder_minute: Option<u32>,
}

fn default_active() -> bool {
    true
}

impl Habit {
    /// The reminder time, if the habit is active and has a complete one
    pub fn reminder_time(&self) -> Option<(u32, u32)> {
        if !self.active {
            return None;
        }
        match (self.reminder_hour, self.reminder_minute) {
            (Some(hour), Some(minute)) => Some((hour, minute)),
            _ => None,
        }
    }
}

/// Lookup interface onto the habit record store owned elsewhere in the app
pub trait HabitSource: Send + Sync {
    fn get(&self, habit_id: i64) -> Result<Option<Habit>, StoreError>;

    /// Active habits that specify a reminder time
    fn active_with_reminders(&self) -> Result<Vec<Habit>, StoreError>;
}

/// Habit records exported by the app as a JSON array, re-read on every call
#[derive(Debug, Clone)]
pub struct JsonHabitStore {
    path: PathBuf,
}

impl JsonHabitStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Vec<Habit>, StoreError> {
        Ok(read_json::<Vec<Habit>>(&self.path)?.unwrap_or_default())
    }
}

impl HabitSource for JsonHabitStore {
    fn get(&self, habit_id: i64) -> Result<Option<Habit>, StoreError> {
        Ok(self.load()?.into_iter().find(|habit| habit.id == habit_id))
    }

    fn active_with_reminders(&self) -> Result<Vec<Habit>, StoreError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|habit| habit.reminder_time().is_some())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_habits_and_filters_reminders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habits.json");
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "name": "Read", "reminder_hour": 9, "reminder_minute": 0},
                {"id": 2, "name": "Stretch", "active": false, "reminder_hour": 18, "reminder_minute": 30},
                {"id": 3, "name": "Water"}
            ]"#,
        )
        .unwrap();

        let store = JsonHabitStore::new(path);
        assert_eq!(store.get(3).unwrap().unwrap().name, "Water");
        assert!(store.get(99).unwrap().is_none());

        let ids: Vec<i64> = store
            .active_with_reminders()
            .unwrap()
            .iter()
            .map(|habit| habit.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn missing_file_means_no_habits() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHabitStore::new(dir.path().join("absent.json"));
        assert!(store.active_with_reminders().unwrap().is_empty());
    }
}
