//! Integration tests for the audio resource lifecycle.

use crate::common::*;
use liftcue::audio::{AudioResourceManager, AudioResourceState, CapabilityProfile, FeedbackEvent};
use liftcue::platform::{EnvironmentSnapshot, GestureKind, LifecycleEvent};
use liftcue::storage::MemoryPreferenceStore;
use liftcue::{DeliveryChannel, FeedbackHub};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const IDLE: Duration = Duration::from_secs(300);

fn manager(env: &EnvironmentSnapshot, factory: &Arc<MockGraphFactory>) -> Arc<AudioResourceManager> {
    AudioResourceManager::new(CapabilityProfile::detect(env), factory.clone(), IDLE)
}

/// Let spawned subscriber tasks run.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_concurrent_initialize_constructs_once() {
    let factory = Arc::new(MockGraphFactory::suspended());
    let resources = manager(&desktop(), &factory);

    let (a, b, c) = tokio::join!(
        resources.initialize(),
        resources.initialize(),
        resources.initialize()
    );

    assert!(a && b && c);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.graph.resumes.load(Ordering::SeqCst), 1);
    assert_eq!(resources.state(), AudioResourceState::Ready);

    // Already ready: no further work.
    assert!(resources.initialize().await);
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn test_failed_initialize_can_be_retried() {
    let factory = Arc::new(MockGraphFactory::new());
    factory.fail.store(true, Ordering::SeqCst);
    let resources = manager(&desktop(), &factory);

    assert!(!resources.initialize().await);
    assert_eq!(resources.state(), AudioResourceState::Uninitialized);

    factory.fail.store(false, Ordering::SeqCst);
    assert!(resources.initialize().await);
    assert_eq!(factory.created(), 2);
}

#[tokio::test]
async fn test_resume_failure_closes_new_graph() {
    let factory = Arc::new(MockGraphFactory::suspended());
    factory.graph.fail_resume.store(true, Ordering::SeqCst);
    let resources = manager(&desktop(), &factory);

    assert!(!resources.initialize().await);
    assert_eq!(resources.state(), AudioResourceState::Uninitialized);
    assert_eq!(factory.graph.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_graph_primitive_reports_false() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&haptic_only(), &factory);

    assert!(!resources.initialize().await);
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_gesture_required_defers_until_first_gesture() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&android(), &factory);
    let (tx, rx) = broadcast::channel(8);
    resources.attach(rx);

    assert!(!resources.start().await);
    assert_eq!(factory.created(), 0);

    tx.send(LifecycleEvent::Gesture(GestureKind::Key)).unwrap();
    settle().await;

    assert_eq!(resources.state(), AudioResourceState::Ready);
    assert!(resources.gesture_seen());

    // The listener is one-shot.
    tx.send(LifecycleEvent::Gesture(GestureKind::Tap)).unwrap();
    settle().await;
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn test_foreground_resumes_only_after_gesture() {
    // Gesture seen before backgrounding.
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&android(), &factory);
    resources.start().await;
    resources
        .handle_event(LifecycleEvent::Gesture(GestureKind::Press))
        .await;
    assert_eq!(resources.state(), AudioResourceState::Ready);

    resources.handle_event(LifecycleEvent::Hidden).await;
    assert_eq!(resources.state(), AudioResourceState::Suspended);
    resources.handle_event(LifecycleEvent::Visible).await;
    assert_eq!(resources.state(), AudioResourceState::Ready);

    // Initialized programmatically; no gesture ever observed.
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&android(), &factory);
    assert!(resources.initialize().await);
    assert!(!resources.gesture_seen());

    resources.handle_event(LifecycleEvent::Hidden).await;
    resources.handle_event(LifecycleEvent::Visible).await;
    assert_eq!(resources.state(), AudioResourceState::Suspended);
    assert_eq!(factory.graph.resumes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_initialize_does_not_resume_past_gesture_gate() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&android(), &factory);
    assert!(resources.initialize().await);

    resources.handle_event(LifecycleEvent::Hidden).await;
    assert!(!resources.initialize().await);
    assert_eq!(resources.state(), AudioResourceState::Suspended);
    assert!(!resources.gesture_seen());
    assert_eq!(factory.graph.resumes.load(Ordering::SeqCst), 0);

    // Still gated on the next foreground.
    resources.handle_event(LifecycleEvent::Visible).await;
    assert_eq!(resources.state(), AudioResourceState::Suspended);

    // A real gesture opens the gate.
    resources
        .handle_event(LifecycleEvent::Gesture(GestureKind::Tap))
        .await;
    assert!(resources.initialize().await);
    assert_eq!(resources.state(), AudioResourceState::Ready);
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn test_desktop_has_no_gesture_gate() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&desktop(), &factory);

    assert!(resources.start().await);
    resources.handle_event(LifecycleEvent::Hidden).await;
    resources.handle_event(LifecycleEvent::Visible).await;

    assert_eq!(resources.state(), AudioResourceState::Ready);
    assert_eq!(factory.graph.suspends.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timeout_suspends() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&desktop(), &factory);
    assert!(resources.initialize().await);

    tokio::time::sleep(IDLE - Duration::from_secs(1)).await;
    assert_eq!(resources.state(), AudioResourceState::Ready);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(resources.state(), AudioResourceState::Suspended);
    assert_eq!(factory.graph.suspends.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activity_restarts_idle_window() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&desktop(), &factory);
    assert!(resources.initialize().await);

    tokio::time::sleep(Duration::from_secs(200)).await;
    resources.note_activity();

    tokio::time::sleep(Duration::from_secs(250)).await;
    assert_eq!(resources.state(), AudioResourceState::Ready);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(resources.state(), AudioResourceState::Suspended);
}

#[tokio::test(start_paused = true)]
async fn test_play_resumes_after_idle_suspend() {
    let mocks = MockPlatform::new();
    let hub = FeedbackHub::new(
        &config(),
        Arc::new(MemoryPreferenceStore::default()),
        mocks.backends(desktop()),
    );
    hub.start().await;

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(hub.resources().state(), AudioResourceState::Suspended);

    assert_eq!(
        hub.play(FeedbackEvent::ButtonClick).await,
        Some(DeliveryChannel::Synthesized)
    );
    assert_eq!(hub.resources().state(), AudioResourceState::Ready);
    assert_eq!(mocks.graph_factory.created(), 1);
    assert_eq!(mocks.graph().resumes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_app_is_not_resumed_by_play() {
    let mocks = MockPlatform::new();
    let hub = FeedbackHub::new(
        &config(),
        Arc::new(MemoryPreferenceStore::default()),
        mocks.backends(desktop()),
    );
    hub.start().await;
    hub.resources().handle_event(LifecycleEvent::Hidden).await;

    assert_eq!(
        hub.play(FeedbackEvent::RestComplete).await,
        Some(DeliveryChannel::Visual)
    );
    assert_eq!(hub.resources().state(), AudioResourceState::Suspended);
}

#[tokio::test]
async fn test_shutdown_is_terminal_and_idempotent() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&desktop(), &factory);
    assert!(resources.initialize().await);

    resources.shutdown().await;
    resources.shutdown().await;

    assert_eq!(resources.state(), AudioResourceState::Closed);
    assert_eq!(factory.graph.closes.load(Ordering::SeqCst), 1);
    assert!(!resources.initialize().await);
    assert!(resources.ready_graph().is_none());

    // Lifecycle events on a closed resource are no-ops.
    resources.handle_event(LifecycleEvent::Visible).await;
    resources
        .handle_event(LifecycleEvent::Gesture(GestureKind::Tap))
        .await;
    assert_eq!(resources.state(), AudioResourceState::Closed);
    assert_eq!(factory.created(), 1);
}

#[tokio::test]
async fn test_unload_event_closes_resource() {
    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&desktop(), &factory);
    let (tx, rx) = broadcast::channel(8);
    resources.attach(rx);
    assert!(resources.start().await);

    tx.send(LifecycleEvent::Unload).unwrap();
    settle().await;

    assert_eq!(resources.state(), AudioResourceState::Closed);
    assert_eq!(factory.graph.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_silent_mode_probe_is_advisory() {
    let factory = Arc::new(MockGraphFactory::new());
    factory.graph.fail_tones.store(true, Ordering::SeqCst);
    let resources = manager(&iphone(IPHONE_17_UA, true), &factory);

    assert!(resources.initialize().await);
    assert!(resources.silent_mode_suspected());
    assert_eq!(resources.state(), AudioResourceState::Ready);

    let factory = Arc::new(MockGraphFactory::new());
    let resources = manager(&iphone(IPHONE_17_UA, true), &factory);
    assert!(resources.initialize().await);
    assert!(!resources.silent_mode_suspected());
    assert_eq!(factory.graph.probe_count(), 1);
}
