//! Audio Resource Manager
//!
//! Owns the audio graph and its lifecycle: lazy construction gated by the
//! first user gesture, suspend on background, resume on foreground, idle
//! auto-suspend, and teardown. Transitions are computed by the pure
//! [`AudioResourceState::next`] so they can be tested without a runtime.

use super::capability::CapabilityProfile;
use super::tones::{frequencies, Envelope};
use crate::platform::{
    AudioGraph, AudioGraphFactory, GraphState, LifecycleEvent, PlatformError, ToneRequest,
};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Default idle window before the graph is suspended.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Lifecycle state of the audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioResourceState {
    Uninitialized,
    Initializing,
    Ready,
    Suspended,
    /// Terminal
    Closed,
}

/// Inputs that drive state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSignal {
    InitStarted,
    InitSucceeded,
    InitFailed,
    Hidden,
    Visible,
    IdleTimeout,
    /// Resume requested by playback
    Resume,
    Shutdown,
}

impl AudioResourceState {
    /// Next state for `signal`. `gesture_gate_open` is whether audio may be
    /// started without a further user gesture.
    pub fn next(self, signal: ResourceSignal, gesture_gate_open: bool) -> Self {
        use AudioResourceState::*;
        use ResourceSignal::*;

        match (self, signal) {
            (Closed, _) | (_, Shutdown) => Closed,
            (Uninitialized, InitStarted) => Initializing,
            (Initializing, InitSucceeded) => Ready,
            (Initializing, InitFailed) => Uninitialized,
            (Ready, Hidden) | (Ready, IdleTimeout) => Suspended,
            (Suspended, Visible) | (Suspended, Resume) if gesture_gate_open => Ready,
            (state, _) => state,
        }
    }
}

struct Inner {
    profile: CapabilityProfile,
    state: AudioResourceState,
    graph: Option<Arc<dyn AudioGraph>>,
    gesture_seen: bool,
    /// Initialize on the next qualifying gesture
    gesture_listener_armed: bool,
    visible: bool,
    silent_mode_suspected: bool,
    in_flight: Option<Shared<BoxFuture<'static, bool>>>,
    idle_timer: Option<JoinHandle<()>>,
    subscriptions: Vec<JoinHandle<()>>,
}

/// Sole owner of the audio graph.
pub struct AudioResourceManager {
    factory: Arc<dyn AudioGraphFactory>,
    idle_timeout: Duration,
    inner: Mutex<Inner>,
    weak_self: Weak<AudioResourceManager>,
}

impl AudioResourceManager {
    pub fn new(
        profile: CapabilityProfile,
        factory: Arc<dyn AudioGraphFactory>,
        idle_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            factory,
            idle_timeout,
            inner: Mutex::new(Inner {
                profile,
                state: AudioResourceState::Uninitialized,
                graph: None,
                gesture_seen: false,
                gesture_listener_armed: false,
                visible: true,
                silent_mode_suspected: false,
                in_flight: None,
                idle_timer: None,
                subscriptions: Vec::new(),
            }),
            weak_self: weak_self.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capability profile currently in effect.
    pub fn profile(&self) -> CapabilityProfile {
        self.lock().profile.clone()
    }

    /// Adopt a recomputed profile. The current graph and state are kept;
    /// later gating and construction decisions use the new profile.
    pub fn set_profile(&self, profile: CapabilityProfile) {
        let mut inner = self.lock();
        if inner.profile != profile {
            tracing::debug!("Audio capability profile updated: {:?}", profile.platform);
        }
        inner.profile = profile;
    }

    pub fn state(&self) -> AudioResourceState {
        self.lock().state
    }

    pub fn gesture_seen(&self) -> bool {
        self.lock().gesture_seen
    }

    /// Best-effort signal from the iOS probe tone. Not authoritative.
    pub fn silent_mode_suspected(&self) -> bool {
        self.lock().silent_mode_suspected
    }

    fn gate_open(&self, inner: &Inner) -> bool {
        inner.gesture_seen || !inner.profile.first_gesture_required
    }

    /// Whether audio may start without waiting for another gesture.
    pub fn gesture_gate_open(&self) -> bool {
        let inner = self.lock();
        self.gate_open(&inner)
    }

    /// The graph, if it is ready for playback.
    pub fn ready_graph(&self) -> Option<Arc<dyn AudioGraph>> {
        let inner = self.lock();
        match inner.state {
            AudioResourceState::Ready => inner.graph.clone(),
            _ => None,
        }
    }

    /// Begin the lifecycle. Initializes immediately unless the platform
    /// requires a gesture first, in which case the next qualifying gesture
    /// triggers initialization.
    pub async fn start(self: &Arc<Self>) -> bool {
        let deferred = {
            let mut inner = self.lock();
            inner.gesture_listener_armed =
                inner.profile.first_gesture_required && !inner.gesture_seen;
            inner.gesture_listener_armed
        };
        if deferred {
            tracing::info!("Audio initialization deferred until first user gesture");
            return false;
        }

        self.initialize().await
    }

    /// Subscribe to lifecycle events. The subscription ends on shutdown.
    pub fn attach(&self, mut events: broadcast::Receiver<LifecycleEvent>) {
        let weak = self.weak_self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(manager) = weak.upgrade() else { break };
                        manager.handle_event(event).await;
                        if manager.state() == AudioResourceState::Closed {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Lifecycle subscriber lagged by {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.lock().subscriptions.push(handle);
    }

    /// Apply one lifecycle event.
    pub async fn handle_event(self: &Arc<Self>, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Hidden => {
                self.lock().visible = false;
                self.apply(ResourceSignal::Hidden).await;
            }
            LifecycleEvent::Visible => {
                self.lock().visible = true;
                self.apply(ResourceSignal::Visible).await;
            }
            LifecycleEvent::Gesture(kind) => {
                let fire = {
                    let mut inner = self.lock();
                    inner.gesture_seen = true;
                    std::mem::take(&mut inner.gesture_listener_armed)
                };
                if fire {
                    tracing::debug!("First qualifying gesture ({:?}); initializing audio", kind);
                    self.initialize().await;
                }
            }
            LifecycleEvent::Unload => self.shutdown().await,
        }
    }

    /// Construct and start the audio graph.
    ///
    /// Idempotent: returns `true` at once when ready, and concurrent callers
    /// share the in-flight attempt. Failure is reported as `false`.
    pub async fn initialize(self: &Arc<Self>) -> bool {
        enum Attempt {
            Join(Shared<BoxFuture<'static, bool>>),
            Resume,
        }

        let attempt = {
            let mut inner = self.lock();
            match inner.state {
                AudioResourceState::Ready => return true,
                AudioResourceState::Closed => return false,
                AudioResourceState::Suspended => Attempt::Resume,
                AudioResourceState::Initializing => match inner.in_flight.clone() {
                    Some(in_flight) => Attempt::Join(in_flight),
                    None => return false,
                },
                AudioResourceState::Uninitialized => {
                    inner.state = inner.state.next(ResourceSignal::InitStarted, true);
                    let this = Arc::clone(self);
                    let in_flight = async move { this.construct().await }.boxed().shared();
                    inner.in_flight = Some(in_flight.clone());
                    Attempt::Join(in_flight)
                }
            }
        };

        match attempt {
            Attempt::Join(in_flight) => in_flight.await,
            // Resuming still needs the gesture gate.
            Attempt::Resume => {
                self.apply(ResourceSignal::Resume).await == AudioResourceState::Ready
            }
        }
    }

    async fn construct(&self) -> bool {
        let outcome = self.build_graph().await;

        let mut orphan = None;
        let ok = {
            let mut inner = self.lock();
            inner.in_flight = None;
            match outcome {
                Ok(graph) if inner.state == AudioResourceState::Initializing => {
                    inner.state = inner.state.next(ResourceSignal::InitSucceeded, true);
                    inner.graph = Some(graph);
                    self.arm_idle_timer(&mut inner);
                    true
                }
                Ok(graph) => {
                    // Shut down while the graph was being built.
                    orphan = Some(graph);
                    false
                }
                Err(e) => {
                    tracing::warn!("Audio initialization failed: {}", e);
                    inner.state = inner.state.next(ResourceSignal::InitFailed, true);
                    false
                }
            }
        };

        if let Some(graph) = orphan {
            let _ = graph.close().await;
        }
        if ok {
            tracing::info!("Audio graph ready");
        }
        ok
    }

    async fn build_graph(&self) -> Result<Arc<dyn AudioGraph>, PlatformError> {
        let profile = self.profile();
        if !profile.audio_graph {
            return Err(PlatformError::Unavailable("audio graph".to_string()));
        }

        let graph = self.factory.create()?;

        if graph.state() == GraphState::Suspended {
            if let Err(e) = graph.resume().await {
                let _ = graph.close().await;
                return Err(e);
            }
        }

        if profile.is_ios() {
            self.probe_silent_mode(graph.as_ref());
        }

        Ok(graph)
    }

    /// Emit a near-silent tone; an exception during synthesis suggests the
    /// ringer switch is off. A successful call proves nothing.
    fn probe_silent_mode(&self, graph: &dyn AudioGraph) {
        let probe = ToneRequest {
            frequency_hz: frequencies::PROBE,
            start_delay: Duration::ZERO,
            envelope: Envelope::new(0.001, Duration::from_millis(1)),
        };

        if let Err(e) = graph.start_tone(probe) {
            tracing::info!("Silent mode suspected: probe tone failed ({})", e);
            self.lock().silent_mode_suspected = true;
        }
    }

    /// Make the graph playable if the gesture gate allows it: initialize an
    /// untouched resource, or resume one that idled out while visible.
    pub async fn prepare(self: &Arc<Self>) -> bool {
        let (state, gate_open, visible) = {
            let inner = self.lock();
            if !inner.profile.audio_graph {
                return false;
            }
            (inner.state, self.gate_open(&inner), inner.visible)
        };

        match state {
            AudioResourceState::Ready => true,
            AudioResourceState::Uninitialized | AudioResourceState::Initializing if gate_open => {
                self.initialize().await
            }
            AudioResourceState::Suspended if gate_open && visible => {
                self.apply(ResourceSignal::Resume).await == AudioResourceState::Ready
            }
            _ => false,
        }
    }

    /// Record successful playback; restarts the idle window.
    pub fn note_activity(&self) {
        let mut inner = self.lock();
        if inner.state == AudioResourceState::Ready {
            self.arm_idle_timer(&mut inner);
        }
    }

    fn arm_idle_timer(&self, inner: &mut Inner) {
        if let Some(timer) = inner.idle_timer.take() {
            timer.abort();
        }

        let weak = self.weak_self.clone();
        let timeout = self.idle_timeout;
        inner.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(manager) = weak.upgrade() {
                tracing::debug!("Audio idle for {:?}; suspending", timeout);
                manager.apply(ResourceSignal::IdleTimeout).await;
            }
        }));
    }

    /// Run a transition, performing the graph call it implies. The state
    /// only changes if the graph call succeeds.
    async fn apply(&self, signal: ResourceSignal) -> AudioResourceState {
        let (from, to, graph) = {
            let inner = self.lock();
            let from = inner.state;
            let to = from.next(signal, self.gate_open(&inner));
            if from == to {
                return from;
            }
            (from, to, inner.graph.clone())
        };

        let Some(graph) = graph else {
            return from;
        };

        let result = match to {
            AudioResourceState::Suspended => graph.suspend().await,
            AudioResourceState::Ready => graph.resume().await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::warn!("Audio transition {:?} -> {:?} failed: {}", from, to, e);
            return from;
        }

        let mut inner = self.lock();
        if inner.state != from {
            return inner.state;
        }
        inner.state = to;
        match to {
            AudioResourceState::Ready => self.arm_idle_timer(&mut inner),
            AudioResourceState::Suspended => {
                if let Some(timer) = inner.idle_timer.take() {
                    timer.abort();
                }
            }
            _ => {}
        }
        tracing::debug!("Audio resource {:?} -> {:?} ({:?})", from, to, signal);
        to
    }

    /// Release the graph and all subscriptions. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let (graph, idle_timer, subscriptions) = {
            let mut inner = self.lock();
            if inner.state == AudioResourceState::Closed {
                return;
            }
            inner.state = inner.state.next(ResourceSignal::Shutdown, false);
            inner.in_flight = None;
            inner.gesture_listener_armed = false;
            (
                inner.graph.take(),
                inner.idle_timer.take(),
                std::mem::take(&mut inner.subscriptions),
            )
        };

        if let Some(timer) = idle_timer {
            timer.abort();
        }
        if let Some(graph) = graph {
            if graph.state() != GraphState::Closed {
                if let Err(e) = graph.close().await {
                    tracing::debug!("Closing audio graph: {}", e);
                }
            }
        }
        // May include the task running this call; it stops at its next await.
        for subscription in subscriptions {
            subscription.abort();
        }

        tracing::info!("Audio resource closed");
    }
}
