//! Marionette Core - Fundamental types shared by the pose-streaming pipeline
//!
//! This crate defines:
//! - Session identity and session type (FK / VAE)
//! - Lifecycle states of the session controller
//! - The shared error type
//! - Client configuration

pub mod id;
pub mod session;
pub mod error;
pub mod config;

pub use id::*;
pub use session::*;
pub use error::*;
pub use config::*;
