//! Feedback Events
//!
//! The fixed set of workout events that produce feedback, and the visual
//! message shown when no sound or haptic channel is available.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workout events that trigger feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackEvent {
    /// Rest timer reached zero
    RestComplete,
    /// Workout session started
    WorkoutStart,
    /// Workout session finished
    WorkoutComplete,
    /// New personal record logged
    PersonalRecord,
    /// UI button press
    ButtonClick,
    /// Manual sound check from settings
    TestSound,
}

impl FeedbackEvent {
    /// Every event, in declaration order.
    pub const ALL: [FeedbackEvent; 6] = [
        FeedbackEvent::RestComplete,
        FeedbackEvent::WorkoutStart,
        FeedbackEvent::WorkoutComplete,
        FeedbackEvent::PersonalRecord,
        FeedbackEvent::ButtonClick,
        FeedbackEvent::TestSound,
    ];

    /// Wire name used by callers and notification tags.
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackEvent::RestComplete => "restComplete",
            FeedbackEvent::WorkoutStart => "workoutStart",
            FeedbackEvent::WorkoutComplete => "workoutComplete",
            FeedbackEvent::PersonalRecord => "personalRecord",
            FeedbackEvent::ButtonClick => "buttonClick",
            FeedbackEvent::TestSound => "testSound",
        }
    }

    /// Display name for settings screens.
    pub fn display_name(&self) -> &'static str {
        match self {
            FeedbackEvent::RestComplete => "Rest Complete",
            FeedbackEvent::WorkoutStart => "Workout Start",
            FeedbackEvent::WorkoutComplete => "Workout Complete",
            FeedbackEvent::PersonalRecord => "Personal Records",
            FeedbackEvent::ButtonClick => "Button Clicks",
            FeedbackEvent::TestSound => "Test Sound",
        }
    }

    /// Whether the event is worth a system notification. UI clicks are not.
    pub fn is_notifiable(&self) -> bool {
        !matches!(self, FeedbackEvent::ButtonClick)
    }

    /// Message shown when feedback falls through to the visual channel.
    pub fn visual_message(&self) -> VisualMessage {
        let (title, description) = match self {
            FeedbackEvent::RestComplete => ("Rest complete", "Time for your next set."),
            FeedbackEvent::WorkoutStart => ("Workout started", "Let's get moving."),
            FeedbackEvent::WorkoutComplete => ("Workout complete", "Great job, session saved."),
            FeedbackEvent::PersonalRecord => ("New personal record!", "You beat your best."),
            FeedbackEvent::ButtonClick => ("Tap", ""),
            FeedbackEvent::TestSound => (
                "Test feedback",
                "Sound is unavailable, so this message is shown instead.",
            ),
        };

        VisualMessage {
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for FeedbackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown event name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown feedback event: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for FeedbackEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackEvent::ALL
            .into_iter()
            .find(|event| event.name() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Title/description pair for a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualMessage {
    pub title: String,
    pub description: String,
}
