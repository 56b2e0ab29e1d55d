//! Unit tests for notification support detection.

use crate::common::*;
use liftcue::audio::CapabilityDetector;
use liftcue::notifications::{DeliveryMode, NotificationSupportDetector, RegistrationOutcome};
use liftcue::platform::{EnvironmentSnapshot, StaticEnvironment};
use liftcue::storage::NotificationSettings;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn detector(env: EnvironmentSnapshot, host: &Arc<MockAgentHost>) -> NotificationSupportDetector {
    NotificationSupportDetector::new(
        CapabilityDetector::new(Arc::new(StaticEnvironment(env))),
        Some(host.clone()),
        NotificationSettings::default(),
    )
}

#[tokio::test]
async fn test_ios_15_browser_tab_needs_os_update_first() {
    let host = Arc::new(MockAgentHost::default());
    let profile = detector(iphone(IPHONE_15_UA, false), &host).detect().await;

    assert!(!profile.is_supported);
    assert_eq!(profile.delivery, DeliveryMode::Unavailable);
    assert!(profile.reason.as_deref().unwrap().contains("16.4"));
    assert!(profile.remediation[0].starts_with("Update iOS to 16.4"));
    assert!(profile.remediation.iter().any(|s| s.contains("Add to Home Screen")));
    assert!(host.registrations().is_empty());
}

#[tokio::test]
async fn test_recent_ios_in_browser_needs_install() {
    let host = Arc::new(MockAgentHost::default());
    let profile = detector(iphone(IPHONE_17_UA, false), &host).detect().await;

    assert!(!profile.is_supported);
    assert!(profile.reason.as_deref().unwrap().contains("Home Screen"));
    assert!(!profile.remediation.iter().any(|s| s.contains("Update iOS")));
    assert_eq!(profile.remediation[1], "Choose \"Add to Home Screen\"");
}

#[tokio::test]
async fn test_installed_ios_without_push_needs_flag() {
    let host = Arc::new(MockAgentHost::default());
    let mut env = iphone(IPHONE_17_UA, true);
    env.background_agent = false;
    let profile = detector(env, &host).detect().await;

    assert!(!profile.is_supported);
    assert!(profile.remediation[0].contains("Experimental Features"));
}

#[tokio::test]
async fn test_installed_ios_registers_agent() {
    let host = Arc::new(MockAgentHost::default());
    let profile = detector(iphone(IPHONE_17_UA, true), &host).detect().await;

    assert!(profile.is_supported);
    assert_eq!(profile.delivery, DeliveryMode::Background);
    assert_eq!(profile.registration, RegistrationOutcome::Registered);
    assert_eq!(host.registrations(), vec!["/sw.js"]);
}

#[tokio::test]
async fn test_registration_happens_once() {
    let host = Arc::new(MockAgentHost::default());
    let detector = detector(android(), &host);

    detector.detect().await;
    detector.detect().await;
    let profile = detector.detect().await;

    assert_eq!(profile.delivery, DeliveryMode::Background);
    assert_eq!(host.registrations().len(), 1);
    assert!(detector.registration().is_some());
}

#[tokio::test]
async fn test_registration_failure_degrades_to_foreground_only() {
    let host = Arc::new(MockAgentHost::default());
    host.fail.store(true, Ordering::SeqCst);
    let detector = detector(android(), &host);

    let profile = detector.detect().await;

    assert!(profile.is_supported);
    assert_eq!(profile.delivery, DeliveryMode::ForegroundOnly);
    assert!(matches!(profile.registration, RegistrationOutcome::Failed(_)));
    assert!(detector.registration().is_none());

    // Not retried.
    detector.detect().await;
    assert_eq!(host.registrations().len(), 1);
}

#[tokio::test]
async fn test_desktop_without_notification_primitive_unsupported() {
    let host = Arc::new(MockAgentHost::default());
    let mut env = desktop();
    env.notification = false;
    let profile = detector(env, &host).detect().await;

    assert!(!profile.is_supported);
    assert!(profile.guidance().unwrap().contains("1. "));
    assert!(host.registrations().is_empty());
}

#[tokio::test]
async fn test_desktop_without_agent_is_foreground_only() {
    let host = Arc::new(MockAgentHost::default());
    let mut env = desktop();
    env.background_agent = false;
    let profile = detector(env, &host).detect().await;

    assert!(profile.is_supported);
    assert_eq!(profile.delivery, DeliveryMode::ForegroundOnly);
    assert_eq!(profile.registration, RegistrationOutcome::NotAttempted);
    assert!(host.registrations().is_empty());
}
