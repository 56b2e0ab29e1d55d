//! Unit test modules.

#[path = "../common/mod.rs"]
mod common;

mod capability_test;
mod dispatcher_test;
mod notification_support_test;
