//! Platform Primitives
//!
//! Traits for the delivery primitives the feedback subsystem drives: the
//! low-level audio graph, the simple playable-media element, haptics, visual
//! toasts, asset fetching, and the notification surfaces. A backend implements
//! these; everything above this module only sees the traits.

pub mod environment;
pub mod http;
pub mod native;

use crate::audio::events::VisualMessage;
use crate::audio::tones::Envelope;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use environment::{EnvironmentProbe, EnvironmentSnapshot, StaticEnvironment};
pub use http::HttpAssetFetcher;

/// Errors raised by primitive calls.
///
/// These never cross a component boundary: components log them and report
/// `false` or a degraded profile instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Primitive not available: {0}")]
    Unavailable(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Audio resource is closed")]
    Closed,
}

/// State reported by the underlying audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Running,
    Suspended,
    Closed,
}

/// Audio decoded into the graph's native buffer format.
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    /// Interleaved channel count
    pub channels: u16,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Arc<[f32]>,
}

impl DecodedBuffer {
    /// Playable length of the buffer.
    pub fn duration(&self) -> Duration {
        if self.channels == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

/// A slice of the sprite asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteSegment {
    /// Start of the sound within the asset
    pub offset: Duration,
    /// Length of the sound
    pub duration: Duration,
}

impl SpriteSegment {
    pub const fn from_millis(offset_ms: u64, duration_ms: u64) -> Self {
        Self {
            offset: Duration::from_millis(offset_ms),
            duration: Duration::from_millis(duration_ms),
        }
    }
}

/// One oscillator start, routed through a gain envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    /// Frequency in Hz
    pub frequency_hz: f32,
    /// Delay before the oscillator starts
    pub start_delay: Duration,
    /// Gain automation, which also defines the tone length
    pub envelope: Envelope,
}

/// The low-level audio-processing resource (an audio graph/context).
#[async_trait]
pub trait AudioGraph: Send + Sync {
    /// Current state as reported by the platform
    fn state(&self) -> GraphState;

    /// Resume a suspended graph
    async fn resume(&self) -> Result<(), PlatformError>;

    /// Suspend a running graph
    async fn suspend(&self) -> Result<(), PlatformError>;

    /// Release the graph; it cannot be used afterwards
    async fn close(&self) -> Result<(), PlatformError>;

    /// Decode raw asset bytes into a playable buffer
    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedBuffer, PlatformError>;

    /// Play a segment of a decoded buffer through a gain envelope
    fn play_segment(
        &self,
        buffer: &DecodedBuffer,
        segment: SpriteSegment,
        envelope: Envelope,
    ) -> Result<(), PlatformError>;

    /// Start a single oscillator
    fn start_tone(&self, request: ToneRequest) -> Result<(), PlatformError>;
}

/// Constructs the audio graph. Called at most once per resource manager.
pub trait AudioGraphFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn AudioGraph>, PlatformError>;
}

/// A loaded simple-media element (an `<audio>`-style handle).
#[async_trait]
pub trait MediaHandle: Send + Sync {
    /// Move the playhead
    fn seek(&self, position: Duration);

    /// Start playing from the playhead
    async fn play(&self) -> Result<(), PlatformError>;

    /// Stop playing, keeping the playhead
    fn pause(&self);
}

/// Loads simple-media elements.
#[async_trait]
pub trait MediaElementFactory: Send + Sync {
    /// Load `url` and wait until it can play through, or fail on error/timeout
    async fn load(&self, url: &str, timeout: Duration)
        -> Result<Arc<dyn MediaHandle>, PlatformError>;
}

/// Fetches raw asset bytes.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlatformError>;
}

/// Haptic-vibration primitive.
pub trait Haptics: Send + Sync {
    /// Emit an on/off millisecond pattern. Returns whether the platform accepted it.
    fn vibrate(&self, pattern: &[u32]) -> bool;
}

/// Visual toast surface, the feedback channel of last resort.
pub trait VisualFeedback: Send + Sync {
    fn show(&self, message: &VisualMessage);
}

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Replaces an earlier notification with the same tag
    pub tag: String,
    pub icon: Option<String>,
}

/// Foreground notification primitive.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Result<Permission, PlatformError>;

    async fn show(&self, request: NotificationRequest) -> Result<(), PlatformError>;
}

/// A registered background-delivery agent.
#[async_trait]
pub trait BackgroundRegistration: Send + Sync {
    async fn show_notification(&self, request: NotificationRequest)
        -> Result<(), PlatformError>;
}

/// Background-delivery primitive; registers the agent script.
#[async_trait]
pub trait BackgroundAgentHost: Send + Sync {
    async fn register(
        &self,
        script_path: &str,
    ) -> Result<Arc<dyn BackgroundRegistration>, PlatformError>;
}

/// Kind of user input that satisfies the gesture gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Press,
    Tap,
    Key,
}

/// Runtime lifecycle signals delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App moved to the background
    Hidden,
    /// App returned to the foreground
    Visible,
    /// A qualifying user input
    Gesture(GestureKind),
    /// Page/app is going away
    Unload,
}
