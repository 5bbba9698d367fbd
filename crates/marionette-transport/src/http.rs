//! reqwest implementation of the session API

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use marionette_core::{ClientConfig, MarionetteError, MarionetteResult, SessionId};
use marionette_skeleton::SkeletonDefinition;

use crate::{session_path, AnimationList, CreateSessionRequest, CreateSessionResponse, PlaybackCommand, SessionApi};

/// HTTP client for the animation server
#[derive(Clone, Debug)]
pub struct HttpSessionApi {
    client: Client,
    origin: String,
}

impl HttpSessionApi {
    /// Build a client bound to the configured origin and timeout
    pub fn new(config: &ClientConfig) -> MarionetteResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MarionetteError::TransportFailure(e.to_string()))?;

        Ok(HttpSessionApi {
            client,
            origin: config.api_origin.trim_end_matches('/').to_string(),
        })
    }

    /// Get the API origin
    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.origin, path)
    }

    async fn json<T: DeserializeOwned>(&self, what: &str, response: reqwest::Result<Response>) -> MarionetteResult<T> {
        check(what, response)?
            .json::<T>()
            .await
            .map_err(|e| transport(what, e))
    }
}

/// Map send failures and non-2xx statuses to transport failures
fn check(what: &str, response: reqwest::Result<Response>) -> MarionetteResult<Response> {
    let response = response.map_err(|e| transport(what, e))?;
    response.error_for_status().map_err(|e| transport(what, e))
}

fn transport(what: &str, e: reqwest::Error) -> MarionetteError {
    MarionetteError::TransportFailure(format!("{what}: {e}"))
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn list_animations(&self) -> MarionetteResult<Vec<String>> {
        let response = self.client.get(self.url("/animations")).send().await;
        let list: AnimationList = self.json("list animations", response).await?;
        Ok(list.animations)
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> MarionetteResult<CreateSessionResponse> {
        let response = self.client.post(self.url("/sessions")).json(request).send().await;
        self.json("create session", response).await
    }

    async fn fetch_skeleton(&self, id: &SessionId) -> MarionetteResult<SkeletonDefinition> {
        let url = self.url(&format!("{}/skeleton", session_path(id)));
        let response = self.client.get(url).send().await;
        self.json("fetch skeleton", response).await
    }

    async fn delete_session(&self, id: &SessionId) -> MarionetteResult<()> {
        let response = self.client.delete(self.url(&session_path(id))).send().await;
        check("delete session", response)?;
        Ok(())
    }

    async fn send_playback(&self, id: &SessionId, command: PlaybackCommand) -> MarionetteResult<()> {
        let url = self.url(&format!("{}/{}", session_path(id), command.path()));
        let response = self.client.post(url).json(&command.body()).send().await;
        check(command.path(), response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post, MethodRouter};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use marionette_core::SessionType;

    type Log = Arc<Mutex<Vec<String>>>;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn app(log: Log) -> Router {
        Router::new()
            .route("/animations", get(|| async { Json(json!({"animations": ["walk.bvh", "run.bvh"]})) }))
            .route(
                "/sessions",
                post(|State(log): State<Log>, Json(body): Json<Value>| async move {
                    log.lock().unwrap().push(format!("create {}", body["session_id"]));
                    Json(json!({"session_id": "srv-1", "message": "created"}))
                }),
            )
            .route(
                "/sessions/:id/skeleton",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    Ok(Json(json!({
                        "bone_names": ["root", "child"],
                        "parents": [-1, 0],
                        "bind_pose": {
                            "positions": [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                            "rotations": [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]],
                            "scales": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]
                        }
                    })))
                }),
            )
            .route(
                "/sessions/:id",
                delete(|State(log): State<Log>, Path(id): Path<String>| async move {
                    log.lock().unwrap().push(format!("delete {id}"));
                    StatusCode::NO_CONTENT
                }),
            )
            .route("/sessions/:id/play", command("play"))
            .route("/sessions/:id/pause", command("pause"))
            .route("/sessions/:id/speed", command("speed"))
            .route("/sessions/:id/vae_values", command("vae_values"))
            .with_state(log)
    }

    fn command(name: &'static str) -> MethodRouter<Log> {
        post(move |State(log): State<Log>, Path(id): Path<String>, Json(body): Json<Value>| async move {
            log.lock().unwrap().push(format!("{name} {id} {body}"));
            Json(json!({}))
        })
    }

    async fn client(log: Log) -> HttpSessionApi {
        let origin = serve(app(log)).await;
        HttpSessionApi::new(&ClientConfig {
            api_origin: origin,
            request_timeout: Duration::from_secs(5),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_rest_surface() {
        let log: Log = Arc::default();
        let api = client(log.clone()).await;

        let animations = api.list_animations().await.unwrap();
        assert_eq!(animations, vec!["walk.bvh", "run.bvh"]);

        let created = api
            .create_session(&CreateSessionRequest {
                session_id: SessionId::new("s1"),
                session_type: SessionType::Vae,
                animation_file: "walk.bvh".into(),
            })
            .await
            .unwrap();
        let id = created.session_id.unwrap();
        assert_eq!(id, SessionId::new("srv-1"));

        let skeleton = api.fetch_skeleton(&id).await.unwrap();
        assert_eq!(skeleton.bone_names, vec!["root", "child"]);
        skeleton.validate().unwrap();

        api.send_playback(&id, PlaybackCommand::Speed(2.0)).await.unwrap();
        api.send_playback(&id, PlaybackCommand::Pause).await.unwrap();
        api.delete_session(&id).await.unwrap();

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "create \"s1\"".to_string(),
                "speed srv-1 {\"playback_speed\":2.0}".to_string(),
                "pause srv-1 {}".to_string(),
                "delete srv-1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_is_transport_failure() {
        let api = client(Arc::default()).await;
        let err = api.fetch_skeleton(&SessionId::new("missing")).await.unwrap_err();
        assert!(matches!(err, MarionetteError::TransportFailure(ref msg) if msg.contains("fetch skeleton")));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = HttpSessionApi::new(&ClientConfig {
            api_origin: format!("http://{addr}"),
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        })
        .unwrap();

        let err = api.list_animations().await.unwrap_err();
        assert!(err.is_transport());
    }
}
