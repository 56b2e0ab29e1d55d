//! Persisted feedback preference.
//!
//! A single user toggle that gates all sound, haptic, visual and notification
//! feedback. Read before every dispatch; written only by the toggle action.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Preference persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Key-value store holding the feedback toggle.
pub trait PreferenceStore: Send + Sync {
    /// Whether feedback is enabled. Defaults to enabled.
    fn feedback_enabled(&self) -> bool;

    /// The user toggle action.
    fn set_feedback_enabled(&self, enabled: bool) -> Result<(), PreferenceError>;
}

/// In-memory store.
#[derive(Debug)]
pub struct MemoryPreferenceStore {
    enabled: AtomicBool,
}

impl Default for MemoryPreferenceStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MemoryPreferenceStore {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn feedback_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_feedback_enabled(&self, enabled: bool) -> Result<(), PreferenceError> {
        self.enabled.store(enabled, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferenceFile {
    feedback_enabled: bool,
}

impl Default for PreferenceFile {
    fn default() -> Self {
        Self {
            feedback_enabled: true,
        }
    }
}

/// TOML-file backed store. Re-reads the file on every query so toggles from
/// another process are honored.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> PreferenceFile {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return PreferenceFile::default();
        };

        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable preferences {:?}: {}", self.path, e);
            PreferenceFile::default()
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn feedback_enabled(&self) -> bool {
        self.read().feedback_enabled
    }

    fn set_feedback_enabled(&self, enabled: bool) -> Result<(), PreferenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PreferenceError::IoError(e.to_string()))?;
        }

        let file = PreferenceFile {
            feedback_enabled: enabled,
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| PreferenceError::SerializeError(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| PreferenceError::IoError(e.to_string()))?;

        tracing::info!("Feedback {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }
}
