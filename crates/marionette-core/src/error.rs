//! Error types for the pose-streaming pipeline

use thiserror::Error;

use crate::{BoneIndex, LifecycleState};

/// Structural defect found in a skeleton definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeletonFault {
    #[error("length mismatch: {names} names, {parents} parents, {positions} positions, {rotations} rotations, {scales} scales")]
    LengthMismatch {
        names: usize,
        parents: usize,
        positions: usize,
        rotations: usize,
        scales: usize,
    },

    #[error("bone {bone} references parent {parent} outside 0..{count}")]
    ParentOutOfRange {
        bone: BoneIndex,
        parent: i64,
        count: usize,
    },

    #[error("bone {bone} references parent {parent} declared at or after itself")]
    ForwardParent { bone: BoneIndex, parent: BoneIndex },
}

/// Core Marionette errors
#[derive(Error, Debug)]
pub enum MarionetteError {
    // Skeleton errors
    #[error("Malformed skeleton: {0}")]
    MalformedSkeleton(#[from] SkeletonFault),

    #[error("Bone index {index} out of range (bone count {count})")]
    BoneOutOfRange { index: BoneIndex, count: usize },

    // Lifecycle errors
    #[error("Session already active (state: {0})")]
    AlreadyActive(LifecycleState),

    #[error("Operation `{operation}` not valid in state {state}")]
    InvalidTransition {
        state: LifecycleState,
        operation: &'static str,
    },

    // Transport errors
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Stream closed by remote")]
    StreamClosed,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MarionetteError {
    /// Transport-level failures are the only ones an external supervisor may retry
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            MarionetteError::TransportFailure(_) | MarionetteError::StreamClosed
        )
    }
}

/// Result type for Marionette operations
pub type MarionetteResult<T> = Result<T, MarionetteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_fault_converts() {
        let err: MarionetteError = SkeletonFault::ForwardParent { bone: 2, parent: 3 }.into();
        assert!(matches!(
            err,
            MarionetteError::MalformedSkeleton(SkeletonFault::ForwardParent { bone: 2, parent: 3 })
        ));
        assert!(err.to_string().contains("bone 2"));
    }

    #[test]
    fn test_transport_classification() {
        assert!(MarionetteError::StreamClosed.is_transport());
        assert!(MarionetteError::TransportFailure("reset".into()).is_transport());
        assert!(!MarionetteError::AlreadyActive(LifecycleState::Streaming).is_transport());
    }
}
