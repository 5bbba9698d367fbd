//! Marionette Transport - REST and stream plumbing
//!
//! This crate provides:
//! - The `SessionApi` trait and its reqwest implementation
//! - The `PoseStream` / `StreamConnector` traits
//! - A channel-backed stream for plugging in any socket implementation

pub mod api;
pub mod http;
pub mod stream;

pub use api::*;
pub use http::HttpSessionApi;
pub use stream::*;
