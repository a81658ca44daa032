//! Host capability checks

use tokio::process::Command;
use tracing::{info, warn};

/// Check if systemd-inhibit is available for wake locks
pub async fn check_inhibit_available() -> Result<(), String> {
    let output = Command::new("systemd-inhibit")
        .arg("--version")
        .output()
        .await
        .map_err(|_| "systemd-inhibit is not available; alarms will ring without a wake lock".to_string())?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("systemd-inhibit --version failed: {}", stderr);
        return Err(format!("systemd-inhibit is not usable: {}", stderr));
    }

    info!("systemd-inhibit is available");
    Ok(())
}
