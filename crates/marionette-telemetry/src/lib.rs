//! Marionette Telemetry - Observability for the pose stream
//!
//! This crate provides:
//! - Rolling inter-frame interval / frame rate windows
//! - Per-stream counters (frames, bytes, ignored and truncated frames)
//!
//! Nothing here can fail or influence the pipeline; it only observes.

pub mod throughput;
pub mod stats;

pub use throughput::*;
pub use stats::*;
