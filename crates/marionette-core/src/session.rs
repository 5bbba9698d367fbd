//! Session types and lifecycle states
//!
//! A session runs in one of two modes:
//! - FK: forward-kinematic playback of a recorded animation file
//! - VAE: latent-variable driven motion, steered by three control values

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{MarionetteError, SessionId};

/// Session mode requested from the animation server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionType {
    /// Forward kinematics from an animation file
    #[default]
    #[serde(rename = "FK")]
    Fk,
    /// Latent-variable driven
    #[serde(rename = "VAE")]
    Vae,
}

impl SessionType {
    /// All session types, in selector order
    pub fn all() -> &'static [SessionType] {
        &[SessionType::Fk, SessionType::Vae]
    }

    /// Wire name used by the REST API
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Fk => "FK",
            SessionType::Vae => "VAE",
        }
    }

    /// Parse from the wire name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FK" => Some(SessionType::Fk),
            "VAE" => Some(SessionType::Vae),
            _ => None,
        }
    }

    /// Whether latent control values may be sent to this session
    pub fn accepts_vae_values(self) -> bool {
        matches!(self, SessionType::Vae)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionType {
    type Err = MarionetteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionType::parse(s)
            .ok_or_else(|| MarionetteError::InvalidConfig(format!("unknown session type: {s}")))
    }
}

/// Phase of the connect / stream / disconnect sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Creating,
    FetchingSkeleton,
    Streaming,
    Disconnecting,
    Error,
}

impl LifecycleState {
    /// Whether a new session may be created from this state
    #[inline]
    pub fn can_create(self) -> bool {
        self == LifecycleState::Idle
    }

    /// Whether the state owns server-side resources
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LifecycleState::Creating
                | LifecycleState::FetchingSkeleton
                | LifecycleState::Streaming
                | LifecycleState::Disconnecting
        )
    }

    /// Whether the error state may be entered from this state
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            LifecycleState::Creating | LifecycleState::FetchingSkeleton | LifecycleState::Streaming
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Creating => "creating",
            LifecycleState::FetchingSkeleton => "fetching_skeleton",
            LifecycleState::Streaming => "streaming",
            LifecycleState::Disconnecting => "disconnecting",
            LifecycleState::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity and phase of the controller's session
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SessionState {
    pub session_id: Option<SessionId>,
    pub session_type: SessionType,
    pub animation_file: Option<String>,
    pub lifecycle: LifecycleState,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    /// Forget the session identity and return to idle
    pub fn clear(&mut self) {
        self.session_id = None;
        self.animation_file = None;
        self.lifecycle = LifecycleState::Idle;
    }
}
