//! Notification backends

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use notify_rust::{ActionResponse, NotificationHandle, Timeout, Urgency};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::platform::{Importance, Notification, NotificationAction, NotificationId, Notifier};
use crate::error::PlatformError;

/// Freedesktop notifications through `notify-rust`.
///
/// Keeps the server handle of every notification on screen so a repost with
/// the same id updates it in place and `cancel` closes it. Clicked action
/// buttons are forwarded to the channel given to [`DesktopNotifier::with_actions`].
pub struct DesktopNotifier {
    app_name: String,
    on_screen: Mutex<HashMap<NotificationId, NotificationHandle>>,
    actions_tx: Option<mpsc::UnboundedSender<NotificationAction>>,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            on_screen: Mutex::new(HashMap::new()),
            actions_tx: None,
        }
    }

    pub fn with_actions(mut self, actions_tx: mpsc::UnboundedSender<NotificationAction>) -> Self {
        self.actions_tx = Some(actions_tx);
        self
    }

    fn to_desktop(&self, notification: &Notification) -> notify_rust::Notification {
        let mut desktop = notify_rust::Notification::new();
        desktop
            .summary(&notification.title)
            .body(&notification.body)
            .appname(&self.app_name)
            .icon("alarm-clock")
            .urgency(urgency(notification.channel.config().importance));
        for action in &notification.actions {
            desktop.action(action.key(), action.label());
        }
        if notification.ongoing {
            desktop.timeout(Timeout::Never);
        }
        desktop
    }

    /// Forward clicks on `server_id`'s buttons until it is closed
    fn listen_for_actions(&self, server_id: u32) {
        let Some(actions_tx) = self.actions_tx.clone() else {
            return;
        };
        std::thread::spawn(move || {
            let result = notify_rust::handle_action(server_id, |response| {
                if let ActionResponse::Custom(key) = response {
                    match NotificationAction::from_key(key) {
                        Some(action) => {
                            info!("Notification action clicked: {:?}", action);
                            let _ = actions_tx.send(action);
                        }
                        None => debug!("Ignoring notification response {}", key),
                    }
                }
            });
            if let Err(e) = result {
                warn!("Stopped listening for notification actions: {}", e);
            }
        });
    }
}

fn urgency(importance: Importance) -> Urgency {
    match importance {
        Importance::Low => Urgency::Low,
        Importance::Default => Urgency::Normal,
        Importance::High | Importance::Max => Urgency::Critical,
    }
}

fn notification_error(e: notify_rust::error::Error) -> PlatformError {
    PlatformError::Notification(e.to_string())
}

impl Notifier for DesktopNotifier {
    fn post(&self, notification: &Notification) -> Result<(), PlatformError> {
        let mut on_screen = self.on_screen.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = on_screen.get_mut(&notification.id) {
            handle.summary(&notification.title).body(&notification.body);
            return handle.update().map_err(notification_error);
        }

        let handle = self.to_desktop(notification).show().map_err(notification_error)?;
        if !notification.actions.is_empty() {
            self.listen_for_actions(handle.id());
        }
        debug!("Showing notification {} as {}", notification.id, handle.id());
        on_screen.insert(notification.id, handle);
        Ok(())
    }

    fn cancel(&self, id: NotificationId) {
        let handle = self
            .on_screen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if let Some(handle) = handle {
            handle.close();
            debug!("Closed notification {}", id);
        }
    }
}

/// Notifier for headless hosts: every notification becomes a log line
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post(&self, notification: &Notification) -> Result<(), PlatformError> {
        if notification.ongoing && notification.id == NotificationId::Countdown {
            debug!("[{}] {}: {}", notification.id, notification.title, notification.body);
        } else {
            info!("[{}] {}: {}", notification.id, notification.title, notification.body);
        }
        Ok(())
    }

    fn cancel(&self, id: NotificationId) {
        debug!("[{}] withdrawn", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_maps_to_sticky_critical_notification_with_dismiss_button() {
        let notifier = DesktopNotifier::new("Focus Alarm");
        let desktop = notifier.to_desktop(&Notification::alarm());

        assert_eq!(desktop.summary, "Time's up!");
        assert_eq!(desktop.appname, "Focus Alarm");
        assert_eq!(desktop.timeout, Timeout::Never);
        assert_eq!(desktop.actions, vec!["dismiss_alarm".to_string(), "Dismiss".to_string()]);
    }

    #[test]
    fn transient_notifications_keep_server_timeout() {
        let notifier = DesktopNotifier::new("Focus Alarm");
        let desktop = notifier.to_desktop(&Notification::still_running());

        assert_ne!(desktop.timeout, Timeout::Never);
        assert!(desktop.actions.is_empty());
    }

    #[test]
    fn server_errors_become_notification_errors() {
        let err = notification_error(notify_rust::error::Error::from("no notification server"));
        assert!(matches!(err, PlatformError::Notification(ref msg) if msg.contains("no notification server")));
    }

    #[test]
    fn cancelling_unknown_notification_is_a_no_op() {
        DesktopNotifier::new("Focus Alarm").cancel(NotificationId::Countdown);
    }
}
