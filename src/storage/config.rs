//! Application configuration.
//!
//! Feedback and notification settings loaded from TOML in the platform data
//! directory. A missing file yields defaults.

use crate::audio::capability::OsVersion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Sound/haptic feedback settings
    pub feedback: FeedbackSettings,
    /// Notification settings
    pub notifications: NotificationSettings,
}

/// Feedback-engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// Master gain for tones and sprite segments (0.0 - 1.0)
    pub volume: f32,
    /// Idle time before the audio graph is suspended
    pub inactivity_timeout_secs: u64,
    /// Origin the sprite candidates are resolved against
    pub sprite_base_url: String,
    /// Candidate sprite paths, tried in order
    pub sprite_candidates: Vec<String>,
    /// How long to wait for the media element to be able to play through
    pub media_load_timeout_ms: u64,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            inactivity_timeout_secs: 300,
            sprite_base_url: "http://localhost:8080".to_string(),
            sprite_candidates: vec![
                "/sounds/feedback-sprite.mp3".to_string(),
                "/sounds/feedback-sprite.wav".to_string(),
                "/static/sounds/feedback-sprite.mp3".to_string(),
                "/static/sounds/feedback-sprite.wav".to_string(),
            ],
            media_load_timeout_ms: 5000,
        }
    }
}

impl FeedbackSettings {
    /// Absolute candidate URLs in trial order.
    pub fn sprite_urls(&self) -> Vec<String> {
        let base = self.sprite_base_url.trim_end_matches('/');
        self.sprite_candidates
            .iter()
            .map(|path| {
                if path.contains("://") {
                    path.clone()
                } else {
                    format!("{}/{}", base, path.trim_start_matches('/'))
                }
            })
            .collect()
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn media_load_timeout(&self) -> Duration {
        Duration::from_millis(self.media_load_timeout_ms)
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Path of the background-delivery agent script
    pub agent_script_path: String,
    /// Minimum iOS version that delivers web notifications
    pub min_ios_version: OsVersion,
    /// Icon attached to notifications
    pub icon: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            agent_script_path: "/sw.js".to_string(),
            min_ios_version: OsVersion::new(16, 4),
            icon: Some("/icons/icon-192.png".to_string()),
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "liftcue", "LiftCue")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from file.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from a specific path.
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save configuration to a specific path.
pub fn save_config_to(config: &AppConfig, path: &std::path::Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
