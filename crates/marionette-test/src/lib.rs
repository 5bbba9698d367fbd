//! Marionette Test Harness - Fixtures, server stand-ins and frame jitter
//!
//! This crate provides:
//! - Skeleton definitions and pose frames for tests and benchmarks
//! - A recording, failure-scriptable session API
//! - A stream connector that hands its feeds to the test
//! - Seeded frame jitter (truncation, extra bones, stray bytes, text)

pub mod fixtures;
pub mod mock;
pub mod jitter;

pub use fixtures::*;
pub use mock::*;
pub use jitter::*;
