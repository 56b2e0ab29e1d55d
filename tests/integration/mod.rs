//! Integration test modules.

#[path = "../common/mod.rs"]
mod common;

mod lifecycle_test;
