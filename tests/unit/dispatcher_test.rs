//! Unit tests for the notification dispatcher.

use crate::common::*;
use liftcue::audio::{CapabilityDetector, FeedbackEvent};
use liftcue::notifications::{NotificationDispatcher, NotificationSupportDetector};
use liftcue::platform::{EnvironmentSnapshot, Permission, PlatformError, StaticEnvironment};
use liftcue::storage::{MemoryPreferenceStore, NotificationSettings, PreferenceStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct Setup {
    dispatcher: NotificationDispatcher,
    detector: Arc<NotificationSupportDetector>,
    platform: Arc<MockNotifications>,
    host: Arc<MockAgentHost>,
    preferences: Arc<MemoryPreferenceStore>,
}

fn setup(env: EnvironmentSnapshot, permission: Permission) -> Setup {
    let platform = Arc::new(MockNotifications::new(permission));
    let host = Arc::new(MockAgentHost::default());
    let preferences = Arc::new(MemoryPreferenceStore::default());
    let detector = Arc::new(NotificationSupportDetector::new(
        CapabilityDetector::new(Arc::new(StaticEnvironment(env))),
        Some(host.clone()),
        NotificationSettings::default(),
    ));
    let dispatcher = NotificationDispatcher::new(
        preferences.clone(),
        Some(platform.clone()),
        Arc::clone(&detector),
        Some("/icons/icon-192.png".to_string()),
    );

    Setup {
        dispatcher,
        detector,
        platform,
        host,
        preferences,
    }
}

#[tokio::test]
async fn test_request_permission_prompts_when_undecided() {
    let s = setup(desktop(), Permission::Default);

    assert!(s.dispatcher.request_permission().await);
    assert_eq!(s.platform.prompts.load(Ordering::SeqCst), 1);

    // Already granted: no second prompt.
    assert!(s.dispatcher.request_permission().await);
    assert_eq!(s.platform.prompts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_denied_permission_is_not_retried() {
    let s = setup(desktop(), Permission::Denied);

    assert!(!s.dispatcher.request_permission().await);
    assert_eq!(s.platform.prompts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_prompt_is_false() {
    let s = setup(desktop(), Permission::Default);
    *s.platform.answer.lock().unwrap() = Err(PlatformError::NotAllowed("dismissed".to_string()));

    assert!(!s.dispatcher.request_permission().await);
    assert_eq!(s.dispatcher.permission(), Permission::Default);
}

#[tokio::test]
async fn test_send_requires_permission() {
    let s = setup(desktop(), Permission::Default);

    assert!(!s.dispatcher.send(FeedbackEvent::RestComplete, "Rest", "Go").await);
    assert!(s.platform.shown().is_empty());
}

#[tokio::test]
async fn test_send_uses_foreground_without_agent() {
    let s = setup(desktop(), Permission::Granted);

    assert!(s.dispatcher.send(FeedbackEvent::RestComplete, "Rest over", "Next set").await);

    let shown = s.platform.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Rest over");
    assert_eq!(shown[0].body, "Next set");
    assert_eq!(shown[0].tag, "liftcue-restComplete");
    assert_eq!(shown[0].icon.as_deref(), Some("/icons/icon-192.png"));
}

#[tokio::test]
async fn test_send_routes_through_registered_agent() {
    let s = setup(android(), Permission::Granted);
    s.detector.detect().await;

    assert!(s.dispatcher.send(FeedbackEvent::WorkoutComplete, "Done", "Saved").await);

    assert_eq!(s.host.agent.shown().len(), 1);
    assert!(s.platform.shown().is_empty());
}

#[tokio::test]
async fn test_disabled_preference_is_silent_no_op() {
    let s = setup(desktop(), Permission::Granted);
    s.preferences.set_feedback_enabled(false).unwrap();

    assert!(!s.dispatcher.send(FeedbackEvent::PersonalRecord, "PR", "!").await);
    assert!(s.platform.shown().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_is_false() {
    let s = setup(desktop(), Permission::Granted);
    s.platform.fail_show.store(true, Ordering::SeqCst);

    assert!(!s.dispatcher.send(FeedbackEvent::TestSound, "Test", "").await);
}
