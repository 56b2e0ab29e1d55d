//! Background agent payload handling.
//!
//! Decodes push payloads into displayable notifications and decides what a
//! notification click does.

use crate::audio::events::FeedbackEvent;
use crate::platform::NotificationRequest;
use serde::Deserialize;

pub const DEFAULT_TITLE: &str = "LiftCue";
pub const DEFAULT_TAG: &str = "liftcue";
pub const DEFAULT_URL: &str = "/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    tag: Option<String>,
    url: Option<String>,
    event: Option<FeedbackEvent>,
}

/// A notification decoded from a push payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub tag: String,
    /// Where a click should take the user
    pub url: String,
}

impl NotificationContent {
    /// Decode a JSON payload. Non-JSON payloads become the body text; missing
    /// fields fall back to the event's message, then to fixed defaults.
    pub fn from_payload(bytes: &[u8]) -> Self {
        let payload = match serde_json::from_slice::<PushPayload>(bytes) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!("Push payload is not JSON ({}); using it as text", e);
                PushPayload {
                    body: Some(String::from_utf8_lossy(bytes).trim().to_string())
                        .filter(|b| !b.is_empty()),
                    ..Default::default()
                }
            }
        };

        let message = payload.event.map(|e| e.visual_message());
        let title = payload
            .title
            .or_else(|| message.as_ref().map(|m| m.title.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let body = payload
            .body
            .or_else(|| message.map(|m| m.description))
            .unwrap_or_default();
        let tag = payload
            .tag
            .or_else(|| payload.event.map(super::dispatcher::notification_tag))
            .unwrap_or_else(|| DEFAULT_TAG.to_string());

        Self {
            title,
            body,
            tag,
            url: payload.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    pub fn to_request(&self, icon: Option<String>) -> NotificationRequest {
        NotificationRequest {
            title: self.title.clone(),
            body: self.body.clone(),
            tag: self.tag.clone(),
            icon,
        }
    }
}

/// An open app window known to the background agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: String,
    pub url: String,
}

/// What to do when a notification is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    Focus(String),
    Open(String),
}

impl ClickAction {
    /// Focus the window already showing `url`, else any open window, else
    /// open a new one.
    pub fn resolve(clients: &[ClientWindow], url: &str) -> Self {
        clients
            .iter()
            .find(|c| path_of(&c.url) == path_of(url))
            .or_else(|| clients.first())
            .map(|c| ClickAction::Focus(c.id.clone()))
            .unwrap_or_else(|| ClickAction::Open(url.to_string()))
    }
}

/// Path component of an absolute or relative URL.
fn path_of(url: &str) -> &str {
    let without_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => return url,
    };
    match without_scheme.find('/') {
        Some(idx) => &without_scheme[idx..],
        None => "/",
    }
}
