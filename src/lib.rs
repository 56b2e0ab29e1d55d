//! LiftCue - Adaptive Workout Feedback
//!
//! Delivers audible, haptic, visual and notification feedback for workout
//! events across platforms with very different audio and notification
//! restrictions. Each event walks a fallback cascade so that some feedback
//! always reaches the user.

pub mod audio;
pub mod hub;
pub mod notifications;
pub mod platform;
pub mod storage;

// Re-export commonly used types
pub use audio::engine::{DeliveryChannel, FeedbackEngine};
pub use audio::events::FeedbackEvent;
pub use hub::{FeedbackHub, PlatformBackends, TriggerOutcome};
pub use notifications::support::NotificationSupportProfile;
pub use storage::config::AppConfig;
