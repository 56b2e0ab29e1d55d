//! Storage module for configuration and preferences.

pub mod config;
pub mod preferences;

pub use config::{AppConfig, ConfigError, FeedbackSettings, NotificationSettings};
pub use preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceError, PreferenceStore,
};
