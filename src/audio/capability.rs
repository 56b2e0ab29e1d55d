//! Capability Detection
//!
//! Classifies the runtime platform and records which delivery primitives
//! exist. Detection is a pure function of an [`EnvironmentSnapshot`]; every
//! call produces a fresh [`CapabilityProfile`].

use crate::platform::{EnvironmentProbe, EnvironmentSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Ios,
    Android,
    Other,
}

impl PlatformFamily {
    pub fn is_mobile(&self) -> bool {
        !matches!(self, PlatformFamily::Other)
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformFamily::Ios => write!(f, "iOS"),
            PlatformFamily::Android => write!(f, "Android"),
            PlatformFamily::Other => write!(f, "Other"),
        }
    }
}

/// A `major.minor` operating system version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `16_4_1` or `16.4` style versions. Missing minor is 0.
    fn parse_with(s: &str, separator: char) -> Option<Self> {
        let mut parts = s.split(separator);
        let major = parts.next()?.parse().ok()?;
        let minor = parts
            .next()
            .and_then(|m| m.parse().ok())
            .unwrap_or(0);
        Some(Self { major, minor })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for OsVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with(s.trim(), '.').ok_or_else(|| format!("Invalid OS version: {}", s))
    }
}

impl TryFrom<String> for OsVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OsVersion> for String {
    fn from(version: OsVersion) -> Self {
        version.to_string()
    }
}

/// Immutable snapshot of platform restrictions and available primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityProfile {
    pub platform: PlatformFamily,
    /// Running as an installed (home-screen) app rather than a browser tab
    pub installed_app: bool,
    pub audio_graph: bool,
    pub simple_media: bool,
    pub haptics: bool,
    pub notification: bool,
    pub background_agent: bool,
    /// Audio may only start after a user gesture
    pub first_gesture_required: bool,
    /// Concurrent oscillators play without glitches
    pub can_play_multiple: bool,
    /// Detected OS version (iOS only)
    pub os_version: Option<OsVersion>,
}

impl CapabilityProfile {
    /// Classify an environment snapshot. Never fails; absent primitives are `false`.
    pub fn detect(env: &EnvironmentSnapshot) -> Self {
        let platform = classify_platform(env);
        let installed_app = env.display_standalone || env.navigator_standalone;
        let os_version = match platform {
            PlatformFamily::Ios => ios_version(&env.user_agent),
            _ => None,
        };

        let profile = Self {
            platform,
            installed_app,
            audio_graph: env.audio_graph,
            simple_media: env.simple_media,
            haptics: env.vibration,
            notification: env.notification,
            background_agent: env.background_agent,
            first_gesture_required: platform.is_mobile(),
            can_play_multiple: platform != PlatformFamily::Ios,
            os_version,
        };

        tracing::debug!(
            "Detected {} (installed: {}, graph: {}, media: {}, haptics: {})",
            profile.platform,
            profile.installed_app,
            profile.audio_graph,
            profile.simple_media,
            profile.haptics
        );

        profile
    }

    /// The simple-media element starves on this platform; prefer the graph.
    pub fn simple_media_unreliable(&self) -> bool {
        self.platform == PlatformFamily::Ios
    }

    pub fn is_ios(&self) -> bool {
        self.platform == PlatformFamily::Ios
    }
}

fn classify_platform(env: &EnvironmentSnapshot) -> PlatformFamily {
    let ua = env.user_agent.as_str();

    if ["iPhone", "iPad", "iPod"].iter().any(|d| ua.contains(d)) {
        return PlatformFamily::Ios;
    }
    // iPadOS reports a desktop user agent but keeps its touch points.
    if ua.contains("Macintosh") && env.max_touch_points > 1 {
        return PlatformFamily::Ios;
    }
    if ua.contains("Android") {
        return PlatformFamily::Android;
    }

    PlatformFamily::Other
}

/// Extract the iOS version from `... OS 16_4_1 like Mac OS X`, or from
/// `Version/16.4` on desktop-mode iPads.
fn ios_version(ua: &str) -> Option<OsVersion> {
    if let Some(idx) = ua.find(" OS ") {
        let rest = &ua[idx + 4..];
        let token = rest.split_whitespace().next()?;
        if let Some(version) = OsVersion::parse_with(token, '_') {
            return Some(version);
        }
    }

    let idx = ua.find("Version/")?;
    let token = ua[idx + 8..].split_whitespace().next()?;
    OsVersion::parse_with(token, '.')
}

/// Produces capability profiles from a probe.
#[derive(Clone)]
pub struct CapabilityDetector {
    probe: Arc<dyn EnvironmentProbe>,
}

impl CapabilityDetector {
    pub fn new(probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self { probe }
    }

    /// Take a new snapshot and classify it.
    pub fn detect(&self) -> CapabilityProfile {
        CapabilityProfile::detect(&self.probe.snapshot())
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.probe.snapshot()
    }
}
