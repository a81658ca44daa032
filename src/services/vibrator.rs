//! Vibration output for hosts without a vibration motor

use std::time::Duration;

use tokio::{task::JoinHandle, time::sleep};
use tracing::debug;

use super::platform::{OutputHandle, Vibrator};
use crate::error::PlatformError;

/// Wait/vibrate pattern used while the alarm rings
pub const ALARM_PATTERN: [Duration; 4] = [
    Duration::from_millis(0),
    Duration::from_millis(500),
    Duration::from_millis(500),
    Duration::from_millis(500),
];

/// Walks the pattern on a timer and logs each pulse
#[derive(Debug, Default)]
pub struct LogVibrator;

impl Vibrator for LogVibrator {
    fn vibrate_repeating(&self, pattern: &[Duration]) -> Result<Box<dyn OutputHandle>, PlatformError> {
        let pattern = pattern.to_vec();
        let cycle: Duration = pattern.iter().sum();
        let task = tokio::spawn(async move {
            if cycle.is_zero() {
                return;
            }
            loop {
                for (i, step) in pattern.iter().enumerate() {
                    if i % 2 == 1 {
                        debug!("bzz ({} ms)", step.as_millis());
                    }
                    sleep(*step).await;
                }
            }
        });
        Ok(Box::new(PatternHandle { task: Some(task) }))
    }
}

struct PatternHandle {
    task: Option<JoinHandle<()>>,
}

impl OutputHandle for PatternHandle {
    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PatternHandle {
    fn drop(&mut self) {
        self.release();
    }
}
