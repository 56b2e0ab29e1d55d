//! Runtime environment snapshot.
//!
//! Raw facts about the host that capability detection classifies. Presence
//! flags describe whether a primitive exists, not whether it works.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Point-in-time description of the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSnapshot {
    /// User-agent string
    pub user_agent: String,
    /// Maximum simultaneous touch points reported by the host
    pub max_touch_points: u32,
    /// Standalone display mode matched
    pub display_standalone: bool,
    /// Legacy standalone flag (older iOS home-screen apps)
    pub navigator_standalone: bool,
    /// Low-level audio graph constructor exists
    pub audio_graph: bool,
    /// Simple playable-media element exists
    pub simple_media: bool,
    /// Vibration primitive exists
    pub vibration: bool,
    /// Notification primitive exists
    pub notification: bool,
    /// Background-delivery (service worker) primitive exists
    pub background_agent: bool,
}

impl EnvironmentSnapshot {
    /// Load a snapshot from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, crate::storage::ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::storage::ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| crate::storage::ConfigError::ParseError(e.to_string()))
    }
}

/// Source of environment snapshots.
pub trait EnvironmentProbe: Send + Sync {
    fn snapshot(&self) -> EnvironmentSnapshot;
}

/// A probe that always reports the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticEnvironment(pub EnvironmentSnapshot);

impl EnvironmentProbe for StaticEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.0.clone()
    }
}
