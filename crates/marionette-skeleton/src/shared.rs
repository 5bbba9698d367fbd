//! Hierarchy handle shared between the decode step and a renderer thread
//!
//! The decode-and-apply step holds the lock for a whole frame, so a reader
//! never observes a half-applied pose.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::{BoneSnapshot, SkeletonHierarchy};

/// Mutex-guarded hierarchy
#[derive(Clone, Debug)]
pub struct SharedHierarchy {
    inner: Arc<Mutex<SkeletonHierarchy>>,
}

impl SharedHierarchy {
    pub fn new(hierarchy: SkeletonHierarchy) -> Self {
        SharedHierarchy {
            inner: Arc::new(Mutex::new(hierarchy)),
        }
    }

    /// Lock for exclusive access
    pub fn lock(&self) -> MutexGuard<'_, SkeletonHierarchy> {
        self.inner.lock()
    }

    /// Run `f` with the hierarchy locked
    pub fn with<R>(&self, f: impl FnOnce(&mut SkeletonHierarchy) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Consistent copy of the current pose
    pub fn snapshot(&self) -> Vec<BoneSnapshot> {
        self.inner.lock().snapshot()
    }

    pub fn bone_count(&self) -> usize {
        self.inner.lock().bone_count()
    }

    /// Number of live handles, including this one
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}
