//! Adaptive Feedback Module
//!
//! Audible, haptic and visual feedback for workout events, degrading
//! gracefully across platforms with different audio restrictions.

pub mod capability;
pub mod context;
pub mod engine;
pub mod events;
pub mod sprite;
pub mod tones;

// Re-export main types
pub use capability::{CapabilityDetector, CapabilityProfile, OsVersion, PlatformFamily};
pub use context::{AudioResourceManager, AudioResourceState, ResourceSignal, DEFAULT_IDLE_TIMEOUT};
pub use engine::{
    DeliveryChannel, FeedbackEngine, FeedbackStrategy, HapticStrategy, PlaybackOutputs,
    SpriteGraphStrategy, SpriteMediaStrategy, SynthesizedStrategy, VisualStrategy,
};
pub use events::{FeedbackEvent, VisualMessage};
pub use sprite::{sprite_segment, LoadReport, SpriteCatalog, SpriteLoader, StrategyOutcome};
pub use tones::{vibration_pattern, Envelope, EventSoundConfig, MelodyNote, ToneSynthesizer};
