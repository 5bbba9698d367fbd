//! Marionette Wire - Binary pose frame format
//!
//! A pose frame is a flat run of little-endian f64 values:
//! - 16 values per bone, one row-major 4x4 world matrix each
//! - bones in definition index order
//! - no header, no trailer
//!
//! Decoding transposes every matrix into the column-major convention used
//! by the skeleton and the renderer.

pub mod frame;
pub mod encode;

pub use frame::*;
pub use encode::*;
