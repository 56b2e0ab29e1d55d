//! Feedback Hub
//!
//! Entry point for workout-flow code. Builds the feedback subsystem from the
//! app configuration and a set of platform backends. Each trigger fans out
//! to the playback engine and the notification dispatcher independently.

use crate::audio::{
    AudioResourceManager, CapabilityDetector, CapabilityProfile, DeliveryChannel, FeedbackEngine,
    FeedbackEvent, PlaybackOutputs, SpriteLoader,
};
use crate::notifications::{
    NotificationDispatcher, NotificationSupportDetector, NotificationSupportProfile,
};
use crate::platform::native::{
    ConsoleToast, NativeEnvironment, RodioGraphFactory, RodioMediaFactory,
};
use crate::platform::{
    AssetFetcher, AudioGraphFactory, BackgroundAgentHost, EnvironmentProbe, Haptics,
    HttpAssetFetcher, LifecycleEvent, MediaElementFactory, NotificationPlatform, VisualFeedback,
};
use crate::storage::{AppConfig, PreferenceError, PreferenceStore};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Lifecycle events buffered per subscriber.
const LIFECYCLE_CAPACITY: usize = 32;

/// The primitives a runtime provides. `None` means the primitive is absent.
#[derive(Clone)]
pub struct PlatformBackends {
    pub probe: Arc<dyn EnvironmentProbe>,
    pub graph_factory: Arc<dyn AudioGraphFactory>,
    pub fetcher: Arc<dyn AssetFetcher>,
    pub media: Option<Arc<dyn MediaElementFactory>>,
    pub haptics: Option<Arc<dyn Haptics>>,
    pub visual: Option<Arc<dyn VisualFeedback>>,
    pub notifications: Option<Arc<dyn NotificationPlatform>>,
    pub agent_host: Option<Arc<dyn BackgroundAgentHost>>,
}

impl PlatformBackends {
    /// rodio audio and a console toast, described by `probe`.
    pub fn native(probe: Arc<dyn EnvironmentProbe>) -> Self {
        let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpAssetFetcher::new());
        Self {
            probe,
            graph_factory: Arc::new(RodioGraphFactory),
            media: Some(Arc::new(RodioMediaFactory::new(Arc::clone(&fetcher)))),
            fetcher,
            haptics: None,
            visual: Some(Arc::new(ConsoleToast)),
            notifications: None,
            agent_host: None,
        }
    }
}

impl Default for PlatformBackends {
    fn default() -> Self {
        Self::native(Arc::new(NativeEnvironment))
    }
}

/// What one trigger produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Channel that delivered feedback, if any
    pub channel: Option<DeliveryChannel>,
    /// Whether a notification was handed to the platform
    pub notified: bool,
}

pub struct FeedbackHub {
    preferences: Arc<dyn PreferenceStore>,
    capabilities: CapabilityDetector,
    resources: Arc<AudioResourceManager>,
    sprites: Arc<SpriteLoader>,
    engine: FeedbackEngine,
    detector: Arc<NotificationSupportDetector>,
    dispatcher: NotificationDispatcher,
    support: Mutex<Option<NotificationSupportProfile>>,
    lifecycle: broadcast::Sender<LifecycleEvent>,
}

impl FeedbackHub {
    /// Wire up the subsystem. Nothing touches the platform until [`start`].
    ///
    /// [`start`]: FeedbackHub::start
    pub fn new(
        config: &AppConfig,
        preferences: Arc<dyn PreferenceStore>,
        backends: PlatformBackends,
    ) -> Self {
        let capabilities = CapabilityDetector::new(Arc::clone(&backends.probe));
        let profile = capabilities.detect();
        let settings = &config.feedback;

        let resources = AudioResourceManager::new(
            profile,
            Arc::clone(&backends.graph_factory),
            settings.inactivity_timeout(),
        );
        let sprites = Arc::new(SpriteLoader::new(
            settings.sprite_urls(),
            Arc::clone(&backends.fetcher),
            backends.media.clone(),
            Arc::clone(&resources),
            settings.media_load_timeout(),
        ));
        let engine = FeedbackEngine::standard(
            Arc::clone(&preferences),
            Arc::clone(&resources),
            Arc::clone(&sprites),
            PlaybackOutputs {
                haptics: backends.haptics.clone(),
                visual: backends.visual.clone(),
            },
            settings.volume,
        );

        let detector = Arc::new(NotificationSupportDetector::new(
            capabilities.clone(),
            backends.agent_host.clone(),
            config.notifications.clone(),
        ));
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&preferences),
            backends.notifications.clone(),
            Arc::clone(&detector),
            config.notifications.icon.clone(),
        );

        let (lifecycle, _) = broadcast::channel(LIFECYCLE_CAPACITY);

        Self {
            preferences,
            capabilities,
            resources,
            sprites,
            engine,
            detector,
            dispatcher,
            support: Mutex::new(None),
            lifecycle,
        }
    }

    /// Subscribe the audio resource to lifecycle events, start it, and detect
    /// notification support.
    pub async fn start(&self) -> NotificationSupportProfile {
        self.resources.attach(self.lifecycle.subscribe());
        let ready = self.resources.start().await;
        tracing::info!(
            "Feedback started (audio ready: {}, channels: {:?})",
            ready,
            self.engine.channels()
        );

        self.refresh_support().await
    }

    /// Sender for runtime lifecycle signals (visibility, gestures, unload).
    pub fn lifecycle(&self) -> broadcast::Sender<LifecycleEvent> {
        self.lifecycle.clone()
    }

    /// Deliver a lifecycle signal to every subscriber.
    pub fn emit(&self, event: LifecycleEvent) {
        if self.lifecycle.send(event).is_err() {
            tracing::debug!("No lifecycle subscribers for {:?}", event);
        }
    }

    /// Play feedback and, for notifiable events, notify. The two paths do not
    /// depend on each other.
    pub async fn trigger(&self, event: FeedbackEvent) -> TriggerOutcome {
        let message = event.visual_message();
        let notify = async {
            if event.is_notifiable() {
                self.dispatcher
                    .send(event, &message.title, &message.description)
                    .await
            } else {
                false
            }
        };

        let (channel, notified) = tokio::join!(self.engine.deliver(event), notify);
        TriggerOutcome { channel, notified }
    }

    /// Play feedback only.
    pub async fn play(&self, event: FeedbackEvent) -> Option<DeliveryChannel> {
        self.engine.deliver(event).await
    }

    /// Ask for notification permission.
    pub async fn request_notification_permission(&self) -> bool {
        self.dispatcher.request_permission().await
    }

    /// Recompute the capability and notification support profiles. The
    /// playback cascade is rebuilt from the new capability profile.
    pub async fn refresh(&self) -> (CapabilityProfile, NotificationSupportProfile) {
        let profile = self.capabilities.detect();
        self.resources.set_profile(profile.clone());
        let channels = self.engine.refresh();
        tracing::info!("Capabilities refreshed (channels: {:?})", channels);
        let support = self.refresh_support().await;
        (profile, support)
    }

    async fn refresh_support(&self) -> NotificationSupportProfile {
        let support = self.detector.detect().await;
        *self.support.lock().unwrap_or_else(PoisonError::into_inner) = Some(support.clone());
        support
    }

    /// Most recent capability profile.
    pub fn capabilities(&self) -> CapabilityProfile {
        self.resources.profile()
    }

    /// Most recent notification support profile, once started.
    pub fn notification_support(&self) -> Option<NotificationSupportProfile> {
        self.support
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn feedback_enabled(&self) -> bool {
        self.preferences.feedback_enabled()
    }

    /// The user-facing sound/haptic toggle.
    pub fn set_feedback_enabled(&self, enabled: bool) -> Result<(), PreferenceError> {
        self.preferences.set_feedback_enabled(enabled)
    }

    pub fn resources(&self) -> &Arc<AudioResourceManager> {
        &self.resources
    }

    pub fn sprites(&self) -> &Arc<SpriteLoader> {
        &self.sprites
    }

    pub fn engine(&self) -> &FeedbackEngine {
        &self.engine
    }

    /// Release the audio graph and end lifecycle subscriptions.
    pub async fn shutdown(&self) {
        self.resources.shutdown().await;
    }
}
