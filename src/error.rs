//! Error types for the alarm pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the durable side files
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to lock {0}")]
    Lock(&'static str),
}

/// Failures reported by an alarm backend for a single tier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("exact alarm permission denied")]
    PermissionDenied,

    #[error("alarm backend unavailable: {0}")]
    Unavailable(String),
}

/// Failures from notification, audio, vibration or wake lock outputs
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("No alarm sound available")]
    NoSoundSource,

    #[error("Failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Notification failed: {0}")]
    Notification(String),
}

#[derive(Error, Debug)]
pub enum TimerError {
    #[error("Timer duration must be greater than zero")]
    InvalidDuration,

    #[error("Failed to persist timer deadline: {0}")]
    Persist(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Invalid reminder time {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
