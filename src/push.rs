//! Push notifications: building the displayed notification and resolving
//! clicks on its actions. Displayed notifications are broadcast to every
//! subscribed client.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::PushConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    /// Open the application
    Explore,
    /// Dismiss
    Close,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionButton {
    pub action: NotificationAction,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<ActionButton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub options: NotificationOptions,
}

/// Build the notification for a push event carrying an optional text payload.
/// A payload is used as is, even when blank; only a missing one gets the
/// default body.
pub fn build_notification(payload: Option<&str>, config: &PushConfig) -> Notification {
    let body = payload.map_or_else(|| config.default_body.clone(), str::to_string);

    Notification {
        title: config.title.clone(),
        options: NotificationOptions {
            body,
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            vibrate: config.vibrate.clone(),
            data: NotificationData {
                date_of_arrival: Utc::now().timestamp_millis(),
                primary_key: 1,
            },
            actions: vec![
                ActionButton {
                    action: NotificationAction::Explore,
                    title: "Ver en GEB".to_string(),
                    icon: config.icon.clone(),
                },
                ActionButton {
                    action: NotificationAction::Close,
                    title: "Cerrar".to_string(),
                    icon: config.icon.clone(),
                },
            ],
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Notification closed and the application opened or focused at `url`
    OpenWindow { url: String },
    /// Notification closed, nothing else
    Closed,
}

/// Resolve a click; `None` is a click on the notification body
pub fn handle_click(action: Option<NotificationAction>, config: &PushConfig) -> ClickOutcome {
    info!(action = ?action, "Notification clicked");
    match action {
        Some(NotificationAction::Explore) => ClickOutcome::OpenWindow {
            url: config.open_url.clone(),
        },
        Some(NotificationAction::Close) | None => ClickOutcome::Closed,
    }
}

/// Fan-out of displayed notifications to connected clients
#[derive(Clone)]
pub struct NotificationCenter {
    tx: broadcast::Sender<Notification>,
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Display `notification`; returns how many clients received it
    pub fn show(&self, notification: Notification) -> usize {
        self.tx.send(notification).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_becomes_body() {
        let n = build_notification(Some("Nueva venta registrada"), &PushConfig::default());
        assert_eq!(n.title, "GEB Sistema");
        assert_eq!(n.options.body, "Nueva venta registrada");
        assert_eq!(n.options.vibrate, vec![100, 50, 100]);
        assert_eq!(n.options.data.primary_key, 1);
    }

    #[test]
    fn test_missing_payload_uses_default_body() {
        let config = PushConfig::default();
        assert_eq!(build_notification(None, &config).options.body, config.default_body);
    }

    #[test]
    fn test_blank_payload_is_kept() {
        let config = PushConfig::default();
        assert_eq!(build_notification(Some(""), &config).options.body, "");
        assert_eq!(build_notification(Some("  "), &config).options.body, "  ");
    }

    #[test]
    fn test_two_named_actions() {
        let n = build_notification(None, &PushConfig::default());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["options"]["actions"][0]["action"], "explore");
        assert_eq!(json["options"]["actions"][1]["action"], "close");
        assert_eq!(json["options"]["badge"], "/favicon.ico");
    }

    #[test]
    fn test_explore_opens_root() {
        let config = PushConfig::default();
        assert_eq!(
            handle_click(Some(NotificationAction::Explore), &config),
            ClickOutcome::OpenWindow { url: "/".to_string() }
        );
        assert_eq!(handle_click(Some(NotificationAction::Close), &config), ClickOutcome::Closed);
        assert_eq!(handle_click(None, &config), ClickOutcome::Closed);
    }

    #[tokio::test]
    async fn test_center_broadcasts_to_subscribers() {
        let center = NotificationCenter::default();
        assert_eq!(center.show(build_notification(None, &PushConfig::default())), 0);

        let mut rx = center.subscribe();
        assert_eq!(center.show(build_notification(Some("hola"), &PushConfig::default())), 1);
        assert_eq!(rx.recv().await.unwrap().options.body, "hola");
    }
}
