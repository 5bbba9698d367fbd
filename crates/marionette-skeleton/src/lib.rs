//! Marionette Skeleton - Articulated bone hierarchy
//!
//! This crate provides:
//! - The skeleton definition received from the animation server
//! - TRS transforms and world-matrix decomposition
//! - The bone arena (`SkeletonHierarchy`) with fixed topology
//! - A mutex-guarded handle for renderers on another thread

pub mod definition;
pub mod transform;
pub mod hierarchy;
pub mod shared;

pub use definition::*;
pub use transform::*;
pub use hierarchy::*;
pub use shared::*;
