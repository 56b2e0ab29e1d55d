//! Notifications Module
//!
//! Support detection with remediation guidance, permission handling and
//! delivery, and the background agent's payload helpers.

pub mod dispatcher;
pub mod push;
pub mod support;

pub use dispatcher::{notification_tag, NotificationDispatcher};
pub use push::{ClickAction, ClientWindow, NotificationContent};
pub use support::{
    DeliveryMode, NotificationSupportDetector, NotificationSupportProfile, RegistrationOutcome,
};
