//! Push delivery, notification clicks and the live notification stream

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::AppState;
use crate::push::{self, Notification, NotificationAction};

/// Deliver a push message. The raw request body is the payload text.
/// An empty request body is a push without payload
pub async fn push_message(State(state): State<AppState>, body: String) -> impl IntoResponse {
    info!("Push notification received");

    let config = state.config.load();
    let payload = (!body.is_empty()).then_some(body.as_str());
    let notification = push::build_notification(payload, &config.push);
    let delivered = state.notifications.show(notification.clone());

    Json(json!({
        "notification": notification,
        "delivered": delivered,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationClick {
    /// Clicked action button; absent for a click on the notification body
    #[serde(default)]
    pub action: Option<String>,
}

/// Unknown action names behave like a click on the body
pub async fn notification_click(
    State(state): State<AppState>,
    Json(click): Json<NotificationClick>,
) -> impl IntoResponse {
    let action = click.action.as_deref().and_then(|name| {
        serde_json::from_value::<NotificationAction>(serde_json::Value::from(name)).ok()
    });

    let config = state.config.load();
    Json(push::handle_click(action, &config.push))
}

/// Server-sent stream of displayed notifications
pub async fn notification_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifications.subscribe();

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(notification) => return Some((Ok(to_event(&notification)), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification subscriber lagging, dropped notifications");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_event(notification: &Notification) -> Event {
    Event::default()
        .event("notification")
        .json_data(notification)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}
