//! Notification Dispatcher
//!
//! Requests permission and delivers notifications, preferring the registered
//! background agent over the foreground primitive. Failures are logged and
//! reported as `false`.

use super::support::NotificationSupportDetector;
use crate::audio::events::FeedbackEvent;
use crate::platform::{NotificationPlatform, NotificationRequest, Permission};
use crate::storage::PreferenceStore;
use std::sync::Arc;

/// Tag shared by every notification for `event`, so a repeat replaces the
/// previous one instead of stacking.
pub fn notification_tag(event: FeedbackEvent) -> String {
    format!("liftcue-{}", event.name())
}

pub struct NotificationDispatcher {
    preferences: Arc<dyn PreferenceStore>,
    platform: Option<Arc<dyn NotificationPlatform>>,
    detector: Arc<NotificationSupportDetector>,
    icon: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        platform: Option<Arc<dyn NotificationPlatform>>,
        detector: Arc<NotificationSupportDetector>,
        icon: Option<String>,
    ) -> Self {
        Self {
            preferences,
            platform,
            detector,
            icon,
        }
    }

    /// Current permission, `Denied` when there is no notification primitive.
    pub fn permission(&self) -> Permission {
        self.platform
            .as_ref()
            .map(|p| p.permission())
            .unwrap_or(Permission::Denied)
    }

    /// Ask for permission. A prior denial is final and is not re-prompted.
    pub async fn request_permission(&self) -> bool {
        let Some(platform) = &self.platform else {
            return false;
        };

        match platform.permission() {
            Permission::Granted => true,
            Permission::Denied => {
                tracing::debug!("Notification permission previously denied");
                false
            }
            Permission::Default => match platform.request_permission().await {
                Ok(Permission::Granted) => {
                    tracing::info!("Notification permission granted");
                    true
                }
                Ok(state) => {
                    tracing::info!("Notification permission not granted: {:?}", state);
                    false
                }
                Err(e) => {
                    tracing::warn!("Notification permission request failed: {}", e);
                    false
                }
            },
        }
    }

    /// Show a notification for `event`. Returns whether it was handed to the
    /// platform.
    pub async fn send(&self, event: FeedbackEvent, title: &str, body: &str) -> bool {
        if !self.preferences.feedback_enabled() {
            tracing::debug!("Feedback disabled; not notifying {}", event);
            return false;
        }
        let Some(platform) = &self.platform else {
            return false;
        };
        if platform.permission() != Permission::Granted {
            tracing::debug!("No notification permission; dropping {}", event);
            return false;
        }

        let request = NotificationRequest {
            title: title.to_string(),
            body: body.to_string(),
            tag: notification_tag(event),
            icon: self.icon.clone(),
        };

        let result = match self.detector.registration() {
            Some(agent) => agent.show_notification(request).await,
            None => platform.show(request).await,
        };

        match result {
            Ok(()) => {
                tracing::debug!("Notified {}", event);
                true
            }
            Err(e) => {
                tracing::warn!("Notification for {} failed: {}", event, e);
                false
            }
        }
    }
}
