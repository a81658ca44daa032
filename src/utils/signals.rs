//! Signal handling for graceful shutdown and task removal

use std::sync::Arc;

use futures::stream::StreamExt;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::info;

use crate::{events::PlatformEvent, state::AppState, tasks::dispatch};

/// Wait for SIGTERM or SIGINT.
///
/// SIGHUP (the controlling terminal went away) is treated as the user
/// dismissing the app while it keeps running, and is dispatched as a
/// task-removed event instead of shutting down.
pub async fn shutdown_signal(state: Arc<AppState>) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;

    while let Some(signal) = signals.next().await {
        match signal {
            SIGHUP => {
                info!("Received SIGHUP, treating as task removal");
                dispatch(&state, PlatformEvent::TaskRemoved);
            }
            _ => {
                info!("Received signal: {}", signal);
                break;
            }
        }
    }
    Ok(())
}
