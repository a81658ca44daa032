//! Bounded wake locks via systemd-inhibit

use std::{process::Stdio, time::Duration};

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::platform::{OutputHandle, WakeLock};
use crate::error::PlatformError;

/// Holds a `systemd-inhibit` child blocking sleep and idle.
///
/// The inhibitor runs `sleep <timeout>` as its payload, so the lock ends on
/// its own at the ceiling even if this process dies without releasing it.
#[derive(Debug, Clone)]
pub struct SystemdInhibitLock {
    who: String,
    why: String,
}

impl SystemdInhibitLock {
    pub fn new(who: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            who: who.into(),
            why: why.into(),
        }
    }
}

impl WakeLock for SystemdInhibitLock {
    fn acquire(&self, timeout: Duration) -> Result<Box<dyn OutputHandle>, PlatformError> {
        let seconds = timeout.as_secs().max(1).to_string();
        let child = Command::new("systemd-inhibit")
            .arg("--what=sleep:idle")
            .arg(format!("--who={}", self.who))
            .arg(format!("--why={}", self.why))
            .arg("--mode=block")
            .args(["sleep", &seconds])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlatformError::Spawn {
                command: "systemd-inhibit".to_string(),
                source,
            })?;

        info!("Wake lock acquired for at most {}s", seconds);
        Ok(Box::new(InhibitHandle { child: Some(child) }))
    }
}

struct InhibitHandle {
    child: Option<Child>,
}

impl OutputHandle for InhibitHandle {
    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.start_kill() {
                Ok(()) => debug!("Wake lock released"),
                Err(e) => warn!("Failed to release wake lock: {}", e),
            }
        }
    }
}

impl Drop for InhibitHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Stand-in when no inhibitor is available
#[derive(Debug, Default)]
pub struct NoWakeLock;

struct NoopHandle;

impl OutputHandle for NoopHandle {
    fn release(&mut self) {}
}

impl WakeLock for NoWakeLock {
    fn acquire(&self, timeout: Duration) -> Result<Box<dyn OutputHandle>, PlatformError> {
        debug!("No wake lock available, ringing for up to {}s unprotected", timeout.as_secs());
        Ok(Box::new(NoopHandle))
    }
}
