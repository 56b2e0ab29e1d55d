//! Unit tests for capability detection.

use crate::common::*;
use liftcue::audio::{CapabilityDetector, CapabilityProfile, OsVersion, PlatformFamily};
use liftcue::platform::{EnvironmentProbe, EnvironmentSnapshot};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[test]
fn test_iphone_is_ios_with_gesture_gate() {
    let profile = CapabilityProfile::detect(&iphone(IPHONE_17_UA, false));

    assert_eq!(profile.platform, PlatformFamily::Ios);
    assert!(profile.first_gesture_required);
    assert!(!profile.can_play_multiple);
    assert!(!profile.installed_app);
    assert_eq!(profile.os_version, Some(OsVersion::new(17, 2)));
    assert!(profile.simple_media_unreliable());
}

#[test]
fn test_installed_app_from_either_standalone_flag() {
    let mut env = iphone(IPHONE_17_UA, false);
    env.navigator_standalone = true;
    assert!(CapabilityProfile::detect(&env).installed_app);

    let env = iphone(IPHONE_17_UA, true);
    assert!(CapabilityProfile::detect(&env).installed_app);
}

#[test]
fn test_android_is_mobile_and_plays_multiple() {
    let profile = CapabilityProfile::detect(&android());

    assert_eq!(profile.platform, PlatformFamily::Android);
    assert!(profile.first_gesture_required);
    assert!(profile.can_play_multiple);
    assert!(profile.haptics);
    assert_eq!(profile.os_version, None);
}

#[test]
fn test_unknown_platform_has_no_gesture_requirement() {
    let profile = CapabilityProfile::detect(&EnvironmentSnapshot {
        user_agent: "SomeEmbeddedBrowser/1.0".to_string(),
        ..Default::default()
    });

    assert_eq!(profile.platform, PlatformFamily::Other);
    assert!(!profile.first_gesture_required);
}

#[test]
fn test_absent_primitives_are_false() {
    let profile = CapabilityProfile::detect(&bare());

    assert!(!profile.audio_graph);
    assert!(!profile.simple_media);
    assert!(!profile.haptics);
    assert!(!profile.notification);
    assert!(!profile.background_agent);
}

/// Reports more touch points on every snapshot.
struct ChangingProbe {
    calls: AtomicU32,
}

impl EnvironmentProbe for ChangingProbe {
    fn snapshot(&self) -> EnvironmentSnapshot {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst);
        EnvironmentSnapshot {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Version/17.0".to_string(),
            max_touch_points: calls * 5,
            ..Default::default()
        }
    }
}

#[test]
fn test_detector_takes_fresh_snapshot_each_call() {
    let detector = CapabilityDetector::new(Arc::new(ChangingProbe {
        calls: AtomicU32::new(0),
    }));

    // First snapshot has no touch points: a desktop Mac.
    assert_eq!(detector.detect().platform, PlatformFamily::Other);
    // Second has five: an iPad in desktop mode.
    assert_eq!(detector.detect().platform, PlatformFamily::Ios);
}
