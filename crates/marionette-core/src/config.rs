//! Client configuration
//!
//! Everything the session controller needs at `create` time. Values come from
//! defaults, from `MARIONETTE_*` environment variables, or are set directly by
//! the embedding application.

use std::time::Duration;

use crate::{MarionetteError, MarionetteResult, SessionId, SessionType};

/// Animation used when the catalogue is empty or nothing was selected
pub const DEFAULT_ANIMATION: &str = "dance1_subject1.bvh";

/// Default REST request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MARIONETTE_";

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Session identifier proposed to the server
    pub session_id: SessionId,
    /// Requested session mode
    pub session_type: SessionType,
    /// REST origin, e.g. `http://localhost:8000`
    pub api_origin: String,
    /// Stream origin, e.g. `ws://localhost:8000/ws`
    pub stream_origin: String,
    /// Animation file used when the caller does not pick one
    pub default_animation: String,
    /// Whether the external camera should track the root bone
    pub camera_follow: bool,
    /// Connect immediately on startup
    pub auto_connect: bool,
    /// Bound on every REST call
    pub request_timeout: Duration,
    /// Capacity of the lifecycle event channel
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            session_id: SessionId::new("6543"),
            session_type: SessionType::Fk,
            api_origin: "http://localhost:8000".to_string(),
            stream_origin: "ws://localhost:8000/ws".to_string(),
            default_animation: DEFAULT_ANIMATION.to_string(),
            camera_follow: false,
            auto_connect: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment
    pub fn from_env() -> MarionetteResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, starting from defaults
    ///
    /// `SERVER_IP` / `SERVER_PORT` derive both origins; explicit
    /// `API_ORIGIN` / `STREAM_ORIGIN` take precedence over them.
    pub fn from_lookup<F>(lookup: F) -> MarionetteResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty());
        let mut config = ClientConfig::default();

        if let Some(id) = get("SESSION_ID") {
            config.session_id = SessionId::new(id.trim());
        }
        if let Some(kind) = get("SESSION_TYPE") {
            config.session_type = kind.parse()?;
        }

        let ip = get("SERVER_IP");
        let port = get("SERVER_PORT");
        if ip.is_some() || port.is_some() {
            let host = ip.as_deref().unwrap_or("localhost").trim().to_string();
            let port: u16 = match port {
                Some(p) => p
                    .trim()
                    .parse()
                    .map_err(|_| MarionetteError::InvalidConfig(format!("invalid server port: {p}")))?,
                None => 8000,
            };
            config.api_origin = format!("http://{host}:{port}");
            config.stream_origin = format!("ws://{host}:{port}/ws");
        }
        if let Some(origin) = get("API_ORIGIN") {
            config.api_origin = origin.trim().to_string();
        }
        if let Some(origin) = get("STREAM_ORIGIN") {
            config.stream_origin = origin.trim().to_string();
        }

        if let Some(anim) = get("DEFAULT_ANIMATION") {
            config.default_animation = anim.trim().to_string();
        }
        if let Some(flag) = get("CAMERA_FOLLOW") {
            config.camera_follow = parse_flag("CAMERA_FOLLOW", &flag)?;
        }
        if let Some(flag) = get("AUTO_CONNECT") {
            config.auto_connect = parse_flag("AUTO_CONNECT", &flag)?;
        }
        if let Some(timeout) = get("REQUEST_TIMEOUT") {
            config.request_timeout = humantime::parse_duration(timeout.trim()).map_err(|e| {
                MarionetteError::InvalidConfig(format!("invalid request timeout {timeout:?}: {e}"))
            })?;
        }
        if let Some(buffer) = get("EVENT_BUFFER") {
            config.event_buffer = buffer
                .trim()
                .parse()
                .map_err(|_| MarionetteError::InvalidConfig(format!("invalid event buffer: {buffer}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check origins, identity and bounds
    pub fn validate(&self) -> MarionetteResult<()> {
        if self.session_id.is_empty() {
            return Err(MarionetteError::InvalidConfig("session id is empty".into()));
        }
        check_origin("api origin", &self.api_origin, &["http://", "https://"])?;
        check_origin("stream origin", &self.stream_origin, &["ws://", "wss://"])?;
        if self.request_timeout.is_zero() {
            return Err(MarionetteError::InvalidConfig("request timeout must be non-zero".into()));
        }
        if self.event_buffer == 0 {
            return Err(MarionetteError::InvalidConfig("event buffer must be non-zero".into()));
        }
        Ok(())
    }

    /// Full URL of a REST path, e.g. `/sessions`
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_origin, path)
    }

    /// Stream URL for a session: `{stream origin}/{session id}`
    pub fn stream_url(&self, session_id: &SessionId) -> String {
        join_url(&self.stream_origin, session_id.as_str())
    }
}

fn parse_flag(name: &str, value: &str) -> MarionetteResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(MarionetteError::InvalidConfig(format!("{ENV_PREFIX}{name}: not a flag: {other}"))),
    }
}

fn check_origin(what: &str, origin: &str, schemes: &[&str]) -> MarionetteResult<()> {
    if origin.is_empty() {
        return Err(MarionetteError::InvalidConfig(format!("{what} is empty")));
    }
    if !schemes.iter().any(|s| origin.starts_with(s)) {
        return Err(MarionetteError::InvalidConfig(format!(
            "{what} {origin:?} must start with one of {schemes:?}"
        )));
    }
    Ok(())
}

fn join_url(origin: &str, path: &str) -> String {
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
