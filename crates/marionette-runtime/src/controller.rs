//! Session lifecycle controller
//!
//! ```text
//! Idle --create--> Creating --> FetchingSkeleton --fetch--> Streaming
//!                     |               |                        |
//!                     +------> Error <+------------------------+
//!                                |                             |
//!                  Idle <--reset-+       Idle <-- Disconnecting <-- disconnect
//! ```
//!
//! The controller is the single owner of the session identity, the skeleton
//! hierarchy and the stream. The hierarchy and the stream exist exactly while
//! the state is `Streaming`; every path out of `Streaming` releases both
//! before its first await.
//!
//! Dropping an operation's future mid-await leaves a recoverable state:
//! `Creating` is left with [`SessionController::reset`], `FetchingSkeleton`
//! with [`SessionController::disconnect`].

use std::future::Future;
use std::time::Instant;

use glam::DVec3;
use tokio::sync::mpsc;

use marionette_core::{
    ClientConfig, LifecycleState, MarionetteError, MarionetteResult, SessionId, SessionState,
    SessionType,
};
use marionette_skeleton::{SharedHierarchy, SkeletonHierarchy};
use marionette_telemetry::{StreamStats, ThroughputReport, ThroughputTelemetry};
use marionette_transport::{
    CreateSessionRequest, PlaybackCommand, PoseStream, SessionApi, StreamConnector, StreamMessage,
};
use marionette_wire::{decode, DecodeOutcome};

use crate::event::{EventSink, LifecycleEvent};
use crate::playback::{clamp_speed, clamp_vae_values, PlaybackState};

/// Parameters of one session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRequest {
    /// Proposed id; the server may assign another
    pub session_id: SessionId,
    pub session_type: SessionType,
    /// `None` selects the configured default animation
    pub animation_file: Option<String>,
}

impl SessionRequest {
    pub fn new(session_id: impl Into<SessionId>, session_type: SessionType) -> Self {
        SessionRequest {
            session_id: session_id.into(),
            session_type,
            animation_file: None,
        }
    }

    pub fn with_animation(mut self, animation_file: impl Into<String>) -> Self {
        self.animation_file = Some(animation_file.into());
        self
    }

    /// Session described by the client configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        SessionRequest::new(config.session_id.clone(), config.session_type)
    }
}

/// What handling one stream message did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Binary frame decoded into the hierarchy
    Applied(DecodeOutcome),
    /// Text frame, not protocol traffic
    Ignored,
    /// Arrived while not streaming
    Dropped,
}

/// Why [`SessionController::run_stream`] returned
#[derive(Debug)]
pub enum StreamEnd {
    /// Shutdown was requested and the session torn down; state is `Idle`
    Disconnected,
    /// The stream closed or failed; state is `Error`
    Failed(MarionetteError),
}

struct ActiveStream {
    hierarchy: SharedHierarchy,
    stream: Box<dyn PoseStream>,
}

/// Drives one session at a time against the animation server
pub struct SessionController<A, C> {
    config: ClientConfig,
    api: A,
    connector: C,
    session: SessionState,
    active: Option<ActiveStream>,
    playback: PlaybackState,
    stats: StreamStats,
    telemetry: ThroughputTelemetry,
    events: EventSink,
    animations: Vec<String>,
}

impl<A: SessionApi, C: StreamConnector> SessionController<A, C> {
    pub fn new(config: ClientConfig, api: A, connector: C) -> Self {
        let session = SessionState {
            session_type: config.session_type,
            ..SessionState::new()
        };
        SessionController {
            config,
            api,
            connector,
            session,
            active: None,
            playback: PlaybackState::default(),
            stats: StreamStats::new(),
            telemetry: ThroughputTelemetry::new(Instant::now()),
            events: EventSink::detached(),
            animations: Vec::new(),
        }
    }

    /// Receive lifecycle events; replaces any earlier subscription
    pub fn subscribe(&mut self) -> mpsc::Receiver<LifecycleEvent> {
        self.events.subscribe(self.config.event_buffer)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.session.lifecycle
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.session_id.as_ref()
    }

    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.session.lifecycle == LifecycleState::Streaming
    }

    /// Handle on the live hierarchy, for a renderer
    ///
    /// Dropping the controller's copy at teardown does not invalidate
    /// handles already given out; they simply stop receiving updates.
    pub fn hierarchy(&self) -> Option<SharedHierarchy> {
        self.active.as_ref().map(|a| a.hierarchy.clone())
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// Counters of the current (or last) stream
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn last_throughput(&self) -> Option<ThroughputReport> {
        self.telemetry.last_report()
    }

    /// Catalogue from the last successful [`list_animations`](Self::list_animations)
    pub fn animations(&self) -> &[String] {
        &self.animations
    }

    /// Lifecycle events lost to a full queue
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Fetch the animation catalogue
    pub async fn list_animations(&mut self) -> MarionetteResult<Vec<String>> {
        let animations = self.api.list_animations().await?;
        tracing::debug!(count = animations.len(), "animation catalogue loaded");
        self.animations = animations.clone();
        Ok(animations)
    }

    /// Load the catalogue, then connect if configured to
    ///
    /// A catalogue failure is logged and does not prevent connecting.
    pub async fn start(&mut self) -> MarionetteResult<Option<SessionId>> {
        if let Err(e) = self.list_animations().await {
            tracing::warn!(error = %e, "could not load animation catalogue");
        }
        if !self.config.auto_connect {
            return Ok(None);
        }
        let request = SessionRequest::from_config(&self.config);
        self.connect(request).await.map(Some)
    }

    /// `Idle -> Creating -> FetchingSkeleton`
    ///
    /// Returns the authoritative session id: the server's when it sends one,
    /// the requested one otherwise. Without an explicit animation the first
    /// catalogue entry is used, then the configured default.
    ///
    /// If the returned future is dropped mid-request the controller stays in
    /// `Creating` with the requested id; [`reset`](Self::reset) recovers.
    pub async fn create(&mut self, request: SessionRequest) -> MarionetteResult<SessionId> {
        let state = self.session.lifecycle;
        if !state.can_create() {
            tracing::warn!(%state, "create rejected, a session is already active");
            return Err(MarionetteError::AlreadyActive(state));
        }

        let animation_file = request.animation_file.unwrap_or_else(|| {
            self.animations
                .first()
                .cloned()
                .unwrap_or_else(|| self.config.default_animation.clone())
        });
        let body = CreateSessionRequest {
            session_id: request.session_id.clone(),
            session_type: request.session_type,
            animation_file: animation_file.clone(),
        };

        self.transition(LifecycleState::Creating);
        self.session.session_id = Some(request.session_id.clone());
        let response = match self.api.create_session(&body).await {
            Ok(response) => response,
            // Nothing exists server-side, so nothing to compensate
            Err(e) => {
                self.session.session_id = None;
                return Err(self.fail(e));
            }
        };

        let session_id = response
            .session_id
            .filter(|id| !id.is_empty())
            .unwrap_or(request.session_id);
        self.session.session_id = Some(session_id.clone());
        self.session.session_type = request.session_type;
        self.session.animation_file = Some(animation_file);

        tracing::info!(
            session = %session_id,
            session_type = %request.session_type,
            animation = self.session.animation_file.as_deref().unwrap_or_default(),
            "session created"
        );
        self.transition(LifecycleState::FetchingSkeleton);
        self.events.emit(LifecycleEvent::SessionCreated {
            session_id: session_id.clone(),
        });
        Ok(session_id)
    }

    /// `FetchingSkeleton -> Streaming`
    ///
    /// Fetches and builds the skeleton, then opens the stream. On any failure
    /// the created session is deleted before moving to `Error`. Returns the
    /// bone count.
    pub async fn fetch(&mut self) -> MarionetteResult<usize> {
        let state = self.session.lifecycle;
        let session_id = match (state, &self.session.session_id) {
            (LifecycleState::FetchingSkeleton, Some(id)) => id.clone(),
            _ => {
                return Err(MarionetteError::InvalidTransition {
                    state,
                    operation: "fetch",
                })
            }
        };

        let opened = open_stream(&self.api, &self.connector, &self.config, &session_id).await;
        let active = match opened {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "session setup failed, deleting");
                delete_best_effort(&self.api, &session_id).await;
                return Err(self.fail(e));
            }
        };

        let bone_count = active.hierarchy.bone_count();
        self.active = Some(active);
        self.stats = StreamStats::new();
        self.telemetry.reset(Instant::now());
        self.playback = PlaybackState::default();
        self.transition(LifecycleState::Streaming);

        tracing::info!(session = %session_id, bone_count, "skeleton ready, streaming");
        self.events.emit(LifecycleEvent::SkeletonReady {
            session_id,
            bone_count,
        });
        Ok(bone_count)
    }

    /// Create, fetch and open the stream in one call
    pub async fn connect(&mut self, request: SessionRequest) -> MarionetteResult<SessionId> {
        let session_id = self.create(request).await?;
        self.fetch().await?;
        Ok(session_id)
    }

    /// Decode one stream message into the hierarchy
    ///
    /// Text frames are counted and ignored. Anything arriving while not
    /// streaming is counted and dropped.
    pub fn handle_message(&mut self, message: StreamMessage, now: Instant) -> MarionetteResult<MessageOutcome> {
        let Some(active) = self.active.as_ref() else {
            self.stats.record_dropped();
            tracing::debug!(state = %self.session.lifecycle, len = message.len(), "message after close dropped");
            return Ok(MessageOutcome::Dropped);
        };

        let payload = match message {
            StreamMessage::Binary(payload) => payload,
            StreamMessage::Text(text) => {
                self.stats.record_text();
                tracing::debug!(len = text.len(), "text frame ignored");
                return Ok(MessageOutcome::Ignored);
            }
        };

        // One lock for the whole frame
        let outcome = active.hierarchy.with(|h| decode(&payload, h))?;

        self.stats
            .record_frame(payload.len(), outcome.is_truncated(), outcome.is_noop());
        if outcome.is_truncated() {
            tracing::debug!(
                available = outcome.available,
                bone_count = outcome.bone_count,
                applied = outcome.applied,
                "frame bone count mismatch"
            );
        }
        self.telemetry.record(now);
        Ok(MessageOutcome::Applied(outcome))
    }

    /// Receive and handle the next stream message
    ///
    /// A remote close or stream error moves the controller to `Error`,
    /// releases the hierarchy and deletes the server session.
    pub async fn pump(&mut self) -> MarionetteResult<MessageOutcome> {
        let state = self.session.lifecycle;
        let Some(active) = self.active.as_mut() else {
            return Err(MarionetteError::InvalidTransition {
                state,
                operation: "pump",
            });
        };
        let received = active.stream.recv().await;
        self.dispatch(received).await
    }

    /// Pump until `shutdown` completes or the stream ends
    ///
    /// On shutdown the session is disconnected. Fails only if not streaming
    /// on entry.
    pub async fn run_stream<F>(&mut self, shutdown: F) -> MarionetteResult<StreamEnd>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let state = self.session.lifecycle;
            let Some(active) = self.active.as_mut() else {
                return Err(MarionetteError::InvalidTransition {
                    state,
                    operation: "run_stream",
                });
            };

            let received = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                received = active.stream.recv() => Some(received),
            };

            match received {
                None => {
                    self.disconnect().await?;
                    return Ok(StreamEnd::Disconnected);
                }
                Some(received) => {
                    if let Err(e) = self.dispatch(received).await {
                        return Ok(StreamEnd::Failed(e));
                    }
                }
            }
        }
    }

    async fn dispatch(
        &mut self,
        received: MarionetteResult<Option<StreamMessage>>,
    ) -> MarionetteResult<MessageOutcome> {
        let failure = match received {
            Ok(Some(message)) => match self.handle_message(message, Instant::now()) {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            },
            Ok(None) => MarionetteError::StreamClosed,
            Err(e) => e,
        };
        Err(self.stream_failed(failure).await)
    }

    async fn stream_failed(&mut self, error: MarionetteError) -> MarionetteError {
        let active = self.active.take();
        let session_id = self.session.session_id.clone();
        let error = self.fail(error);

        if let Some(mut active) = active {
            if let Err(e) = active.stream.close().await {
                tracing::debug!(error = %e, "closing failed stream");
            }
        }
        if let Some(id) = session_id {
            delete_best_effort(&self.api, &id).await;
        }
        error
    }

    /// `Streaming -> Disconnecting -> Idle`
    ///
    /// Releases the stream and the hierarchy, then closes the stream and
    /// deletes the server session. The controller is `Idle` before the first
    /// await, so dropping the future only skips the remaining cleanup. Close
    /// and delete failures are logged. Also abandons a session stopped in
    /// `FetchingSkeleton`.
    pub async fn disconnect(&mut self) -> MarionetteResult<()> {
        let state = self.session.lifecycle;
        if !matches!(state, LifecycleState::Streaming | LifecycleState::FetchingSkeleton) {
            return Err(MarionetteError::InvalidTransition {
                state,
                operation: "disconnect",
            });
        }

        self.transition(LifecycleState::Disconnecting);
        let active = self.active.take();
        let session_id = self.session.session_id.clone();
        self.transition(LifecycleState::Idle);
        self.session.clear();

        if let Some(session_id) = &session_id {
            tracing::info!(session = %session_id, frames = self.stats.frames_applied, "session disconnected");
            self.events.emit(LifecycleEvent::Disconnected {
                session_id: session_id.clone(),
            });
        }

        if let Some(mut active) = active {
            if let Err(e) = active.stream.close().await {
                tracing::warn!(error = %e, "stream close failed");
            }
        }
        if let Some(id) = &session_id {
            delete_best_effort(&self.api, id).await;
        }
        Ok(())
    }

    /// Back to `Idle`, forgetting the session; a no-op when idle
    ///
    /// Accepted from `Error`, and from `Creating` after an abandoned
    /// [`create`](Self::create). The server session of an abandoned create is
    /// not deleted.
    pub fn reset(&mut self) -> MarionetteResult<()> {
        match self.session.lifecycle {
            LifecycleState::Idle => Ok(()),
            LifecycleState::Error => {
                self.transition(LifecycleState::Idle);
                self.session.clear();
                Ok(())
            }
            LifecycleState::Creating => {
                if let Some(id) = &self.session.session_id {
                    tracing::warn!(session = %id, "create abandoned, server session may remain");
                }
                self.transition(LifecycleState::Idle);
                self.session.clear();
                Ok(())
            }
            state => Err(MarionetteError::InvalidTransition {
                state,
                operation: "reset",
            }),
        }
    }

    pub async fn play(&mut self) -> MarionetteResult<()> {
        self.send_playback(PlaybackCommand::Play).await
    }

    pub async fn pause(&mut self) -> MarionetteResult<()> {
        self.send_playback(PlaybackCommand::Pause).await
    }

    /// Set the playback speed, clamped to `[0, 10]`; returns the value sent
    pub async fn set_speed(&mut self, speed: f64) -> MarionetteResult<f64> {
        let speed = clamp_speed(speed);
        self.send_playback(PlaybackCommand::Speed(speed)).await?;
        Ok(speed)
    }

    /// Set the three latent values of a VAE session, each clamped to `[0, 1]`
    pub async fn set_vae_values(&mut self, values: [f64; 3]) -> MarionetteResult<[f64; 3]> {
        if !self.session.session_type.accepts_vae_values() {
            return Err(MarionetteError::InvalidTransition {
                state: self.session.lifecycle,
                operation: "set_vae_values",
            });
        }
        let values = clamp_vae_values(values);
        self.send_playback(PlaybackCommand::VaeValues(values)).await?;
        Ok(values)
    }

    async fn send_playback(&mut self, command: PlaybackCommand) -> MarionetteResult<()> {
        let state = self.session.lifecycle;
        let session_id = match (state, &self.session.session_id) {
            (LifecycleState::Streaming, Some(id)) => id.clone(),
            _ => {
                return Err(MarionetteError::InvalidTransition {
                    state,
                    operation: command.path(),
                })
            }
        };

        self.api.send_playback(&session_id, command).await?;
        self.playback.apply(command);
        tracing::debug!(session = %session_id, command = command.path(), "playback updated");
        Ok(())
    }

    /// Camera anchor: the first bone's position on the ground plane
    ///
    /// `None` unless camera follow is enabled and a skeleton is streaming.
    pub fn follow_target(&self) -> Option<DVec3> {
        if !self.config.camera_follow {
            return None;
        }
        let active = self.active.as_ref()?;
        active.hierarchy.with(|h| {
            let position = h.bone(0)?.local.translation;
            Some(position * DVec3::new(1.0, 0.0, 1.0))
        })
    }

    fn transition(&mut self, to: LifecycleState) {
        let from = std::mem::replace(&mut self.session.lifecycle, to);
        tracing::debug!(%from, %to, "lifecycle transition");
    }

    /// Enter `Error` and publish it
    fn fail(&mut self, error: MarionetteError) -> MarionetteError {
        let during = self.session.lifecycle;
        debug_assert!(during.can_fail(), "cannot fail from {during}");
        self.transition(LifecycleState::Error);
        tracing::error!(%during, error = %error, "session failed");
        self.events.emit(LifecycleEvent::Error {
            during,
            message: error.to_string(),
        });
        error
    }
}

/// GET the skeleton, build it, and open the stream
async fn open_stream<A, C>(
    api: &A,
    connector: &C,
    config: &ClientConfig,
    session_id: &SessionId,
) -> MarionetteResult<ActiveStream>
where
    A: SessionApi,
    C: StreamConnector,
{
    let definition = api.fetch_skeleton(session_id).await?;
    let hierarchy = SkeletonHierarchy::build(&definition)?;
    let stream = connector.connect(&config.stream_url(session_id)).await?;
    Ok(ActiveStream {
        hierarchy: SharedHierarchy::new(hierarchy),
        stream,
    })
}

async fn delete_best_effort<A: SessionApi>(api: &A, session_id: &SessionId) {
    match api.delete_session(session_id).await {
        Ok(()) => tracing::debug!(session = %session_id, "server session deleted"),
        Err(e) => tracing::warn!(session = %session_id, error = %e, "server session delete failed"),
    }
}
