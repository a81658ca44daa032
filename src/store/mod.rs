//! Durable side files
//!
//! The alarm pipeline keeps its own small JSON files next to (not inside) the
//! app's record store, so it can recover without opening the database.

pub mod habits;
pub mod reminder_registry;
pub mod timer_store;

pub use habits::{Habit, HabitSource, JsonHabitStore};
pub use reminder_registry::{ReminderEntry, ReminderRegistry};
pub use timer_store::{PersistedTimer, TimerStore};

use std::{io::ErrorKind, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

/// Write `value` as JSON to a temp file, then rename over `path`
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent).map_err(|source| io_error(path, source))?;
    }

    let tmp_path = path.with_extension("tmp");
    fs_err::write(&tmp_path, json).map_err(|source| io_error(&tmp_path, source))?;
    fs_err::rename(&tmp_path, path).map_err(|source| io_error(path, source))?;
    Ok(())
}

/// Read a JSON file, `None` when it does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs_err::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove a file, treating "already gone" as success
pub(crate) fn remove_file(path: &Path) -> Result<(), StoreError> {
    match fs_err::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(io_error(path, source)),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}
