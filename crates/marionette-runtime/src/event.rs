//! Lifecycle events
//!
//! Published on a bounded channel. Publishing never waits: a full queue drops
//! the event with a warning, a dropped receiver is ignored.

use tokio::sync::mpsc::{self, error::TrySendError};

use marionette_core::{LifecycleState, SessionId};

/// Something observers of the controller may react to
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    /// The server accepted the session
    SessionCreated { session_id: SessionId },
    /// Hierarchy built and stream open; frames will follow
    SkeletonReady { session_id: SessionId, bone_count: usize },
    /// Local disconnect finished
    Disconnected { session_id: SessionId },
    /// The controller moved to `Error`
    Error {
        /// State in which the failure happened
        during: LifecycleState,
        message: String,
    },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::SessionCreated { .. } => "session_created",
            LifecycleEvent::SkeletonReady { .. } => "skeleton_ready",
            LifecycleEvent::Disconnected { .. } => "disconnected",
            LifecycleEvent::Error { .. } => "error",
        }
    }
}

/// Non-blocking event publisher
#[derive(Debug, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<LifecycleEvent>>,
    dropped: u64,
}

impl EventSink {
    /// Sink without a receiver
    pub fn detached() -> Self {
        EventSink::default()
    }

    /// Replace the receiver; the previous one sees its channel close
    pub fn subscribe(&mut self, capacity: usize) -> mpsc::Receiver<LifecycleEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.tx = Some(tx);
        rx
    }

    pub fn emit(&mut self, event: LifecycleEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped += 1;
                tracing::warn!(event = event.name(), "lifecycle event queue full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {
                self.tx = None;
            }
        }
    }

    /// Events lost to a full queue
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn is_attached(&self) -> bool {
        self.tx.is_some()
    }
}
