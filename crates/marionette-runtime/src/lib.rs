//! Marionette Runtime - Session lifecycle and stream processing
//!
//! This crate ties the pieces together:
//! 1. Create the server session (REST)
//! 2. Fetch the skeleton definition and build the hierarchy
//! 3. Open the pose stream
//! 4. Decode each binary frame into the hierarchy, feed telemetry
//! 5. Tear down: close stream, release hierarchy, delete the session
//!
//! Failures during 1-3 delete whatever the server already created and leave
//! the controller in `Error` until it is reset. There is no automatic retry.

pub mod controller;
pub mod event;
pub mod observability;
pub mod playback;

#[cfg(test)]
mod scenarios;

pub use controller::*;
pub use event::*;
pub use observability::{init_logging, LogFormat, LoggingConfig};
pub use playback::*;
