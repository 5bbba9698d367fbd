//! Scriptable stand-ins for the animation server
//!
//! [`RecordingApi`] answers the REST calls from memory and records every
//! call; [`ScriptedConnector`] hands out channel streams whose feeds the test
//! keeps. Both are cheap clones over shared state, so a test can keep one
//! handle while the controller owns the other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use marionette_core::{MarionetteError, MarionetteResult, SessionId};
use marionette_skeleton::SkeletonDefinition;
use marionette_transport::{
    ChannelStream, CreateSessionRequest, CreateSessionResponse, PlaybackCommand, PoseStream,
    SessionApi, StreamConnector, StreamFeed,
};

use crate::fixtures::two_bone_definition;

/// REST operations that can be scripted to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiOp {
    ListAnimations,
    Create,
    FetchSkeleton,
    Delete,
    Playback,
}

/// One recorded REST call
#[derive(Clone, Debug, PartialEq)]
pub enum ApiCall {
    ListAnimations,
    Create(CreateSessionRequest),
    FetchSkeleton(SessionId),
    Delete(SessionId),
    Playback(SessionId, PlaybackCommand),
}

impl ApiCall {
    pub fn op(&self) -> ApiOp {
        match self {
            ApiCall::ListAnimations => ApiOp::ListAnimations,
            ApiCall::Create(_) => ApiOp::Create,
            ApiCall::FetchSkeleton(_) => ApiOp::FetchSkeleton,
            ApiCall::Delete(_) => ApiOp::Delete,
            ApiCall::Playback(..) => ApiOp::Playback,
        }
    }
}

#[derive(Debug)]
struct ApiScript {
    calls: Vec<ApiCall>,
    animations: Vec<String>,
    skeleton: SkeletonDefinition,
    assigned_id: Option<SessionId>,
    failing: HashSet<ApiOp>,
    latency: Duration,
}

/// In-memory [`SessionApi`] that records every call
#[derive(Clone, Debug)]
pub struct RecordingApi {
    inner: Arc<Mutex<ApiScript>>,
}

impl Default for RecordingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingApi {
    /// Serves [`two_bone_definition`] and echoes the requested session id
    pub fn new() -> Self {
        RecordingApi {
            inner: Arc::new(Mutex::new(ApiScript {
                calls: Vec::new(),
                animations: vec!["dance1_subject1.bvh".to_string()],
                skeleton: two_bone_definition(),
                assigned_id: None,
                failing: HashSet::new(),
                latency: Duration::ZERO,
            })),
        }
    }

    pub fn with_skeleton(self, skeleton: SkeletonDefinition) -> Self {
        self.inner.lock().skeleton = skeleton;
        self
    }

    pub fn with_animations<I, S>(self, animations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.lock().animations = animations.into_iter().map(Into::into).collect();
        self
    }

    /// Answer `POST /sessions` with this id instead of echoing the request
    pub fn assign_session_id(self, id: impl Into<SessionId>) -> Self {
        self.inner.lock().assigned_id = Some(id.into());
        self
    }

    /// Make every call of `op` fail with a transport failure
    pub fn failing(self, op: ApiOp) -> Self {
        self.set_failing(op, true);
        self
    }

    /// Delay every call, e.g. to race against a timeout
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().latency = latency;
        self
    }

    pub fn set_failing(&self, op: ApiOp, failing: bool) {
        let mut script = self.inner.lock();
        if failing {
            script.failing.insert(op);
        } else {
            script.failing.remove(&op);
        }
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<ApiCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of calls of one kind
    pub fn count(&self, op: ApiOp) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Session ids passed to `DELETE /sessions/{id}`
    pub fn deleted(&self) -> Vec<SessionId> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ApiCall::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Record the call, then fail it if scripted to
    async fn enter(&self, call: ApiCall) -> MarionetteResult<()> {
        let op = call.op();
        let (latency, fail) = {
            let mut script = self.inner.lock();
            script.calls.push(call);
            (script.latency, script.failing.contains(&op))
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(MarionetteError::TransportFailure(format!("scripted failure: {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionApi for RecordingApi {
    async fn list_animations(&self) -> MarionetteResult<Vec<String>> {
        self.enter(ApiCall::ListAnimations).await?;
        Ok(self.inner.lock().animations.clone())
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> MarionetteResult<CreateSessionResponse> {
        self.enter(ApiCall::Create(request.clone())).await?;
        let assigned = self.inner.lock().assigned_id.clone();
        Ok(CreateSessionResponse {
            session_id: Some(assigned.unwrap_or_else(|| request.session_id.clone())),
        })
    }

    async fn fetch_skeleton(&self, id: &SessionId) -> MarionetteResult<SkeletonDefinition> {
        self.enter(ApiCall::FetchSkeleton(id.clone())).await?;
        Ok(self.inner.lock().skeleton.clone())
    }

    async fn delete_session(&self, id: &SessionId) -> MarionetteResult<()> {
        self.enter(ApiCall::Delete(id.clone())).await
    }

    async fn send_playback(&self, id: &SessionId, command: PlaybackCommand) -> MarionetteResult<()> {
        self.enter(ApiCall::Playback(id.clone(), command)).await
    }
}

#[derive(Debug, Default)]
struct ConnectorState {
    urls: Vec<String>,
    feeds: Vec<StreamFeed>,
    opened: usize,
    refuse: bool,
}

/// [`StreamConnector`] that keeps the feed of every stream it opens
#[derive(Clone, Debug)]
pub struct ScriptedConnector {
    inner: Arc<Mutex<ConnectorState>>,
    capacity: usize,
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ScriptedConnector {
    pub fn new(capacity: usize) -> Self {
        ScriptedConnector {
            inner: Arc::default(),
            capacity,
        }
    }

    /// Reject every connect attempt
    pub fn refusing(self) -> Self {
        self.set_refuse(true);
        self
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.inner.lock().refuse = refuse;
    }

    /// URLs of every connect attempt, including refused ones
    pub fn urls(&self) -> Vec<String> {
        self.inner.lock().urls.clone()
    }

    /// Streams opened so far
    pub fn connections(&self) -> usize {
        self.inner.lock().opened
    }

    /// Take the feed of the most recent connection
    pub fn take_feed(&self) -> Option<StreamFeed> {
        self.inner.lock().feeds.pop()
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> MarionetteResult<Box<dyn PoseStream>> {
        let mut state = self.inner.lock();
        state.urls.push(url.to_string());
        if state.refuse {
            return Err(MarionetteError::TransportFailure(format!("connection refused: {url}")));
        }
        let (stream, feed) = ChannelStream::pair(url, self.capacity);
        state.feeds.push(feed);
        state.opened += 1;
        Ok(Box::new(stream))
    }
}
