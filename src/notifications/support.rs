//! Notification Support Detection
//!
//! Applies notification policy on top of the capability profile. iOS only
//! delivers web notifications to installed home-screen apps on recent
//! releases; everywhere else the notification primitive is enough.

use crate::audio::capability::{CapabilityDetector, CapabilityProfile, OsVersion, PlatformFamily};
use crate::platform::{BackgroundAgentHost, BackgroundRegistration};
use crate::storage::NotificationSettings;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// How notifications can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Through the background agent, even while the app is not in front
    Background,
    /// Only through the foreground primitive
    ForegroundOnly,
    Unavailable,
}

/// Outcome of background-agent registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    NotAttempted,
    Registered,
    Failed(String),
}

/// Why notifications are unavailable and how to fix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationSupportProfile {
    pub is_supported: bool,
    pub delivery: DeliveryMode,
    pub platform: PlatformFamily,
    pub registration: RegistrationOutcome,
    pub reason: Option<String>,
    /// Ordered steps the user can take
    pub remediation: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

impl NotificationSupportProfile {
    /// Pure policy evaluation.
    pub fn evaluate(
        capabilities: &CapabilityProfile,
        min_ios_version: OsVersion,
        registration: &RegistrationOutcome,
    ) -> Self {
        let unsupported = |reason: String, steps: &[&str]| Self {
            is_supported: false,
            delivery: DeliveryMode::Unavailable,
            platform: capabilities.platform,
            registration: registration.clone(),
            reason: Some(reason),
            remediation: steps.iter().map(|s| s.to_string()).collect(),
            detected_at: Utc::now(),
        };

        if capabilities.platform == PlatformFamily::Ios {
            if let Some(version) = capabilities.os_version.filter(|v| *v < min_ios_version) {
                let update = format!(
                    "Update iOS to {} or later (Settings > General > Software Update)",
                    min_ios_version
                );
                let mut profile = unsupported(
                    format!(
                        "iOS {} cannot deliver web notifications; {} or later is required",
                        version, min_ios_version
                    ),
                    &[
                        "Tap the Share button in Safari",
                        "Choose \"Add to Home Screen\"",
                        "Open the app from its Home Screen icon",
                    ],
                );
                profile.remediation.insert(0, update);
                return profile;
            }

            if !capabilities.installed_app {
                return unsupported(
                    "On iOS, notifications only work when the app is installed to the Home Screen"
                        .to_string(),
                    &[
                        "Tap the Share button in Safari",
                        "Choose \"Add to Home Screen\"",
                        "Open the app from its Home Screen icon",
                    ],
                );
            }

            if !capabilities.notification || !capabilities.background_agent {
                return unsupported(
                    "Web notifications are turned off on this device".to_string(),
                    &[
                        "Open Settings > Safari > Advanced > Experimental Features",
                        "Enable \"Notifications\" and \"Push API\"",
                        "Close and reopen the app from the Home Screen",
                    ],
                );
            }
        } else if !capabilities.notification {
            return unsupported(
                "This browser does not support notifications".to_string(),
                &["Use an up-to-date browser with notification support"],
            );
        }

        let delivery = match registration {
            RegistrationOutcome::Registered => DeliveryMode::Background,
            _ => DeliveryMode::ForegroundOnly,
        };

        Self {
            is_supported: true,
            delivery,
            platform: capabilities.platform,
            registration: registration.clone(),
            reason: None,
            remediation: Vec::new(),
            detected_at: Utc::now(),
        }
    }

    /// Text for the remediation dialog, if notifications are unavailable.
    pub fn guidance(&self) -> Option<String> {
        let reason = self.reason.as_ref()?;
        let mut text = reason.clone();
        for (i, step) in self.remediation.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", i + 1, step));
        }
        Some(text)
    }
}

struct Registration {
    outcome: RegistrationOutcome,
    handle: Option<Arc<dyn BackgroundRegistration>>,
}

/// Detects notification support and registers the background agent once.
pub struct NotificationSupportDetector {
    capabilities: CapabilityDetector,
    agent_host: Option<Arc<dyn BackgroundAgentHost>>,
    settings: NotificationSettings,
    registration: OnceCell<Registration>,
}

impl NotificationSupportDetector {
    pub fn new(
        capabilities: CapabilityDetector,
        agent_host: Option<Arc<dyn BackgroundAgentHost>>,
        settings: NotificationSettings,
    ) -> Self {
        Self {
            capabilities,
            agent_host,
            settings,
            registration: OnceCell::new(),
        }
    }

    /// Recompute the support profile, registering the agent on first support.
    pub async fn detect(&self) -> NotificationSupportProfile {
        let capabilities = self.capabilities.detect();
        let min = self.settings.min_ios_version;

        let current = self
            .registration
            .get()
            .map(|r| r.outcome.clone())
            .unwrap_or(RegistrationOutcome::NotAttempted);
        let profile = NotificationSupportProfile::evaluate(&capabilities, min, &current);

        if !profile.is_supported || !capabilities.background_agent {
            if let Some(reason) = &profile.reason {
                tracing::info!("Notifications unavailable: {}", reason);
            }
            return profile;
        }

        let outcome = self.register_once().await;
        NotificationSupportProfile::evaluate(&capabilities, min, &outcome)
    }

    async fn register_once(&self) -> RegistrationOutcome {
        let registration = self
            .registration
            .get_or_init(|| async {
                let Some(host) = &self.agent_host else {
                    return Registration {
                        outcome: RegistrationOutcome::Failed("no agent host".to_string()),
                        handle: None,
                    };
                };

                match host.register(&self.settings.agent_script_path).await {
                    Ok(handle) => {
                        tracing::info!(
                            "Registered background agent {}",
                            self.settings.agent_script_path
                        );
                        Registration {
                            outcome: RegistrationOutcome::Registered,
                            handle: Some(handle),
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Background agent registration failed: {}", e);
                        Registration {
                            outcome: RegistrationOutcome::Failed(e.to_string()),
                            handle: None,
                        }
                    }
                }
            })
            .await;

        registration.outcome.clone()
    }

    /// The registered agent, if registration succeeded.
    pub fn registration(&self) -> Option<Arc<dyn BackgroundRegistration>> {
        self.registration.get().and_then(|r| r.handle.clone())
    }
}
