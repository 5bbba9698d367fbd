//! REST session API
//!
//! | Method | Path                         | Body                          |
//! |--------|------------------------------|-------------------------------|
//! | GET    | `/animations`                |                               |
//! | POST   | `/sessions`                  | `CreateSessionRequest`        |
//! | GET    | `/sessions/{id}/skeleton`    |                               |
//! | DELETE | `/sessions/{id}`             |                               |
//! | POST   | `/sessions/{id}/play`        | `{}`                          |
//! | POST   | `/sessions/{id}/pause`       | `{}`                          |
//! | POST   | `/sessions/{id}/speed`       | `{"playback_speed": f}`       |
//! | POST   | `/sessions/{id}/vae_values`  | `{"vae_values": [f, f, f]}`   |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use marionette_core::{MarionetteResult, SessionId, SessionType};
use marionette_skeleton::SkeletonDefinition;

/// Body of `POST /sessions`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub session_id: SessionId,
    pub session_type: SessionType,
    pub animation_file: String,
}

/// Response of `POST /sessions`
///
/// Only `session_id` is interpreted; the server may send more.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Response of `GET /animations`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationList {
    #[serde(default)]
    pub animations: Vec<String>,
}

/// Playback commands for a running session
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Speed(f64),
    VaeValues([f64; 3]),
}

impl PlaybackCommand {
    /// Path suffix under `/sessions/{id}/`
    pub fn path(&self) -> &'static str {
        match self {
            PlaybackCommand::Play => "play",
            PlaybackCommand::Pause => "pause",
            PlaybackCommand::Speed(_) => "speed",
            PlaybackCommand::VaeValues(_) => "vae_values",
        }
    }

    /// JSON body
    pub fn body(&self) -> Value {
        match self {
            PlaybackCommand::Play | PlaybackCommand::Pause => json!({}),
            PlaybackCommand::Speed(speed) => json!({ "playback_speed": speed }),
            PlaybackCommand::VaeValues(values) => json!({ "vae_values": values }),
        }
    }
}

/// Path of a session resource
pub fn session_path(id: &SessionId) -> String {
    format!("/sessions/{}", id.as_str())
}

/// REST operations the session controller depends on
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// `GET /animations`
    async fn list_animations(&self) -> MarionetteResult<Vec<String>>;

    /// `POST /sessions`
    async fn create_session(&self, request: &CreateSessionRequest) -> MarionetteResult<CreateSessionResponse>;

    /// `GET /sessions/{id}/skeleton`
    async fn fetch_skeleton(&self, id: &SessionId) -> MarionetteResult<SkeletonDefinition>;

    /// `DELETE /sessions/{id}`
    async fn delete_session(&self, id: &SessionId) -> MarionetteResult<()>;

    /// `POST /sessions/{id}/{play|pause|speed|vae_values}`
    async fn send_playback(&self, id: &SessionId, command: PlaybackCommand) -> MarionetteResult<()>;
}
