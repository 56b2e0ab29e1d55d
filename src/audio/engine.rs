//! Fallback Playback Engine
//!
//! Plays feedback for an event by walking an ordered list of delivery
//! strategies and stopping at the first that succeeds:
//! sprite via graph, sprite via simple media, synthesized score, haptic
//! pattern, visual message.

use super::context::AudioResourceManager;
use super::events::FeedbackEvent;
use super::sprite::SpriteLoader;
use super::tones::{vibration_pattern, Envelope, ToneSynthesizer};
use crate::platform::{Haptics, VisualFeedback};
use crate::storage::PreferenceStore;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// Which strategy delivered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    SpriteGraph,
    SpriteMedia,
    Synthesized,
    Haptic,
    Visual,
}

impl DeliveryChannel {
    /// Whether this channel used the audio graph.
    pub fn uses_graph(&self) -> bool {
        matches!(self, DeliveryChannel::SpriteGraph | DeliveryChannel::Synthesized)
    }
}

/// One step of the fallback cascade.
#[async_trait]
pub trait FeedbackStrategy: Send + Sync {
    fn channel(&self) -> DeliveryChannel;

    /// Try to deliver `event`. Must not panic or propagate platform errors.
    async fn attempt(&self, event: FeedbackEvent) -> bool;
}

/// Step 1: sprite segment through the audio graph.
pub struct SpriteGraphStrategy {
    sprites: Arc<SpriteLoader>,
    resources: Arc<AudioResourceManager>,
    volume: f32,
}

impl SpriteGraphStrategy {
    pub fn new(sprites: Arc<SpriteLoader>, resources: Arc<AudioResourceManager>, volume: f32) -> Self {
        Self {
            sprites,
            resources,
            volume,
        }
    }
}

#[async_trait]
impl FeedbackStrategy for SpriteGraphStrategy {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::SpriteGraph
    }

    async fn attempt(&self, event: FeedbackEvent) -> bool {
        let Some(catalog) = self.sprites.catalog() else {
            return false;
        };
        let (Some(segment), Some(buffer)) = (catalog.segment(event), catalog.buffer()) else {
            return false;
        };
        let Some(graph) = self.resources.ready_graph() else {
            return false;
        };

        match graph.play_segment(buffer, segment, Envelope::new(self.volume, segment.duration)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Sprite playback failed for {}: {}", event, e);
                false
            }
        }
    }
}

/// Step 2: sprite segment through the shared simple-media element.
pub struct SpriteMediaStrategy {
    sprites: Arc<SpriteLoader>,
}

impl SpriteMediaStrategy {
    pub fn new(sprites: Arc<SpriteLoader>) -> Self {
        Self { sprites }
    }
}

#[async_trait]
impl FeedbackStrategy for SpriteMediaStrategy {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::SpriteMedia
    }

    async fn attempt(&self, event: FeedbackEvent) -> bool {
        let Some(catalog) = self.sprites.catalog() else {
            return false;
        };
        let (Some(segment), Some(media)) = (catalog.segment(event), catalog.media()) else {
            return false;
        };

        media.seek(segment.offset);
        if let Err(e) = media.play().await {
            tracing::warn!("Media sprite playback failed for {}: {}", event, e);
            return false;
        }

        // Fire-and-forget stop; overlapping segments are allowed to decay.
        let media = Arc::clone(media);
        tokio::spawn(async move {
            tokio::time::sleep(segment.duration).await;
            media.pause();
        });

        true
    }
}

/// Step 3: synthesized tone or melody.
pub struct SynthesizedStrategy {
    synth: ToneSynthesizer,
}

impl SynthesizedStrategy {
    pub fn new(synth: ToneSynthesizer) -> Self {
        Self { synth }
    }
}

#[async_trait]
impl FeedbackStrategy for SynthesizedStrategy {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Synthesized
    }

    async fn attempt(&self, event: FeedbackEvent) -> bool {
        self.synth.play_event(event)
    }
}

/// Step 4: vibration. Counts as delivered even though it is silent, since it
/// still reaches a user whose phone is muted.
pub struct HapticStrategy {
    haptics: Arc<dyn Haptics>,
}

impl HapticStrategy {
    pub fn new(haptics: Arc<dyn Haptics>) -> Self {
        Self { haptics }
    }
}

#[async_trait]
impl FeedbackStrategy for HapticStrategy {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Haptic
    }

    async fn attempt(&self, event: FeedbackEvent) -> bool {
        if !self.haptics.vibrate(vibration_pattern(event)) {
            tracing::debug!("Vibration for {} was not accepted", event);
        }
        true
    }
}

/// Step 5: visual toast. Cannot fail.
pub struct VisualStrategy {
    visual: Arc<dyn VisualFeedback>,
}

impl VisualStrategy {
    pub fn new(visual: Arc<dyn VisualFeedback>) -> Self {
        Self { visual }
    }
}

#[async_trait]
impl FeedbackStrategy for VisualStrategy {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Visual
    }

    async fn attempt(&self, event: FeedbackEvent) -> bool {
        self.visual.show(&event.visual_message());
        true
    }
}

/// Optional primitives for the standard cascade.
#[derive(Default, Clone)]
pub struct PlaybackOutputs {
    pub haptics: Option<Arc<dyn Haptics>>,
    pub visual: Option<Arc<dyn VisualFeedback>>,
}

/// Runs the fallback cascade for each event.
pub struct FeedbackEngine {
    preferences: Arc<dyn PreferenceStore>,
    resources: Arc<AudioResourceManager>,
    sprites: Option<Arc<SpriteLoader>>,
    /// Inputs for rebuilding the standard cascade
    standard: Option<(PlaybackOutputs, f32)>,
    strategies: RwLock<Arc<Vec<Box<dyn FeedbackStrategy>>>>,
}

impl FeedbackEngine {
    /// Engine with an explicit strategy order.
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        resources: Arc<AudioResourceManager>,
        sprites: Option<Arc<SpriteLoader>>,
        strategies: Vec<Box<dyn FeedbackStrategy>>,
    ) -> Self {
        Self {
            preferences,
            resources,
            sprites,
            standard: None,
            strategies: RwLock::new(Arc::new(strategies)),
        }
    }

    /// Engine with the standard cascade, keeping only the steps whose
    /// primitives the capability profile reports.
    pub fn standard(
        preferences: Arc<dyn PreferenceStore>,
        resources: Arc<AudioResourceManager>,
        sprites: Arc<SpriteLoader>,
        outputs: PlaybackOutputs,
        volume: f32,
    ) -> Self {
        let strategies = standard_strategies(&resources, &sprites, &outputs, volume);
        let mut engine = Self::new(preferences, resources, Some(sprites), strategies);
        engine.standard = Some((outputs, volume));
        engine
    }

    /// Rebuild the standard cascade from the resource manager's current
    /// profile. Engines built with an explicit order are left unchanged.
    pub fn refresh(&self) -> Vec<DeliveryChannel> {
        if let (Some((outputs, volume)), Some(sprites)) = (&self.standard, &self.sprites) {
            let strategies = standard_strategies(&self.resources, sprites, outputs, *volume);
            *self
                .strategies
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Arc::new(strategies);
        }
        let channels = self.channels();
        tracing::debug!("Feedback cascade: {:?}", channels);
        channels
    }

    fn current(&self) -> Arc<Vec<Box<dyn FeedbackStrategy>>> {
        Arc::clone(&self.strategies.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Channels in cascade order.
    pub fn channels(&self) -> Vec<DeliveryChannel> {
        self.current().iter().map(|s| s.channel()).collect()
    }

    /// Play feedback for `event`. `false` only when feedback is switched off
    /// or no channel exists.
    pub async fn play(&self, event: FeedbackEvent) -> bool {
        self.deliver(event).await.is_some()
    }

    /// Play feedback and report which channel delivered it.
    pub async fn deliver(&self, event: FeedbackEvent) -> Option<DeliveryChannel> {
        if !self.preferences.feedback_enabled() {
            tracing::debug!("Feedback disabled; skipping {}", event);
            return None;
        }
        let strategies = self.current();
        if strategies.is_empty() {
            return None;
        }

        let profile = self.resources.profile();
        let sprite_loadable = if profile.audio_graph {
            self.resources.prepare().await
        } else {
            profile.simple_media
        };
        if let (true, Some(sprites)) = (sprite_loadable, &self.sprites) {
            sprites.load().await;
        }

        for strategy in strategies.iter() {
            let channel = strategy.channel();
            if strategy.attempt(event).await {
                if channel.uses_graph() {
                    self.resources.note_activity();
                }
                tracing::debug!("Delivered {} via {:?}", event, channel);
                return Some(channel);
            }
            tracing::debug!("{:?} could not deliver {}", channel, event);
        }

        None
    }
}

fn standard_strategies(
    resources: &Arc<AudioResourceManager>,
    sprites: &Arc<SpriteLoader>,
    outputs: &PlaybackOutputs,
    volume: f32,
) -> Vec<Box<dyn FeedbackStrategy>> {
    let profile = resources.profile();
    let mut strategies: Vec<Box<dyn FeedbackStrategy>> = Vec::new();

    if profile.audio_graph {
        strategies.push(Box::new(SpriteGraphStrategy::new(
            Arc::clone(sprites),
            Arc::clone(resources),
            volume,
        )));
    }
    if profile.simple_media && !profile.simple_media_unreliable() {
        strategies.push(Box::new(SpriteMediaStrategy::new(Arc::clone(sprites))));
    }
    if profile.audio_graph {
        strategies.push(Box::new(SynthesizedStrategy::new(ToneSynthesizer::new(
            Arc::clone(resources),
            volume,
        ))));
    }
    if let (true, Some(haptics)) = (profile.haptics, &outputs.haptics) {
        strategies.push(Box::new(HapticStrategy::new(Arc::clone(haptics))));
    }
    if let Some(visual) = &outputs.visual {
        strategies.push(Box::new(VisualStrategy::new(Arc::clone(visual))));
    }

    strategies
}
