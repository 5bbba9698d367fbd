//! End-to-end scenarios: a controller task fed through a scripted stream,
//! with renderers reading the hierarchy from other threads.

use std::thread;
use std::time::{Duration, Instant};

use glam::DVec3;
use tokio::sync::oneshot;

use marionette_core::{ClientConfig, LifecycleState, MarionetteError, SessionId, SessionType};
use marionette_skeleton::SharedHierarchy;
use marionette_test::{
    animated_frame, chain_definition, humanoid_definition, translation_frame, ApiOp, FrameJitter,
    JitterConfig, RecordingApi, ScriptedConnector,
};
use marionette_transport::StreamMessage;

use crate::{LifecycleEvent, MessageOutcome, SessionController, SessionRequest, StreamEnd};

type TestController = SessionController<RecordingApi, ScriptedConnector>;

async fn streaming(api: RecordingApi) -> (TestController, RecordingApi, ScriptedConnector) {
    let connector = ScriptedConnector::new(256);
    let mut controller = SessionController::new(ClientConfig::default(), api.clone(), connector.clone());
    controller
        .connect(SessionRequest::new("e2e", SessionType::Fk))
        .await
        .unwrap();
    (controller, api, connector)
}

/// Wait until bone 0 sits at `x` on the X axis
async fn wait_for_root_x(hierarchy: &SharedHierarchy, x: f64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let current = hierarchy.with(|h| h.bone(0).map(|b| b.local.translation.x));
        if current == Some(x) {
            return;
        }
        assert!(Instant::now() < deadline, "frame never applied");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_stream_until_remote_close() {
    let (mut controller, api, connector) =
        streaming(RecordingApi::new().with_skeleton(humanoid_definition())).await;
    let feed = connector.take_feed().unwrap();

    let task = tokio::spawn(async move {
        let end = controller.run_stream(std::future::pending::<()>()).await;
        (controller, end)
    });

    for i in 0..120 {
        feed.send_binary(animated_frame(25, i as f64 * 0.05)).await.unwrap();
    }
    drop(feed);

    let (controller, end) = task.await.unwrap();
    match end.unwrap() {
        StreamEnd::Failed(MarionetteError::StreamClosed) => {}
        other => panic!("unexpected end: {other:?}"),
    }
    assert_eq!(controller.stats().frames_applied, 120);
    assert_eq!(controller.stats().truncated_frames, 0);
    assert_eq!(controller.state(), LifecycleState::Error);
    assert!(controller.hierarchy().is_none());
    assert_eq!(api.deleted(), vec![SessionId::new("e2e")]);
}

#[tokio::test]
async fn test_shutdown_disconnects_cleanly() {
    let (mut controller, api, connector) = streaming(RecordingApi::new()).await;
    let feed = connector.take_feed().unwrap();
    let hierarchy = controller.hierarchy().unwrap();
    let mut events = controller.subscribe();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let end = controller
            .run_stream(async move {
                let _ = stop_rx.await;
            })
            .await;
        (controller, end)
    });

    for i in 1..=10 {
        let x = i as f64;
        feed.send_binary(translation_frame(&[DVec3::new(x, 0.0, 0.0), DVec3::new(x, 1.0, 0.0)]))
            .await
            .unwrap();
    }
    wait_for_root_x(&hierarchy, 10.0).await;

    stop_tx.send(()).unwrap();
    let (controller, end) = task.await.unwrap();
    assert!(matches!(end.unwrap(), StreamEnd::Disconnected));
    assert_eq!(controller.state(), LifecycleState::Idle);
    assert_eq!(controller.session_id(), None);
    assert_eq!(api.deleted(), vec![SessionId::new("e2e")]);

    // The renderer's handle keeps the last pose but is no longer fed
    assert_eq!(hierarchy.handle_count(), 1);
    assert!(feed.is_closed());
    assert!(feed.send_binary(translation_frame(&[DVec3::ZERO])).await.is_err());

    assert_eq!(
        events.recv().await,
        Some(LifecycleEvent::Disconnected {
            session_id: SessionId::new("e2e")
        })
    );
}

#[tokio::test]
async fn test_jittered_stream_never_fails() {
    let (mut controller, _, _) =
        streaming(RecordingApi::new().with_skeleton(chain_definition(2))).await;
    let mut jitter = FrameJitter::new(JitterConfig::hostile(), 0xC0FFEE);

    let mut binary = 0u64;
    for i in 0..400 {
        let message = jitter.perturb(animated_frame(2, i as f64 * 0.01));
        if matches!(message, StreamMessage::Binary(_)) {
            binary += 1;
        }
        let outcome = controller.handle_message(message, Instant::now()).unwrap();
        assert_ne!(outcome, MessageOutcome::Dropped);
    }

    let stats = controller.stats();
    let injected = jitter.stats();
    assert_eq!(controller.state(), LifecycleState::Streaming);
    assert_eq!(stats.frames_applied, binary);
    assert_eq!(stats.text_frames_ignored, injected.text_injected);
    assert_eq!(stats.truncated_frames, injected.mismatched());
}

#[tokio::test]
async fn test_renderer_never_sees_half_applied_frame() {
    let (mut controller, _, _) =
        streaming(RecordingApi::new().with_skeleton(chain_definition(32))).await;
    let hierarchy = controller.hierarchy().unwrap();

    let reader = thread::spawn(move || {
        let mut observed = 0;
        loop {
            let snapshot = hierarchy.snapshot();
            let x = snapshot[0].position.x;
            assert!(snapshot.iter().all(|b| b.position.x == x), "torn frame at x = {x}");
            observed += 1;
            // Controller released its handle
            if hierarchy.handle_count() == 1 {
                return observed;
            }
        }
    });

    for i in 0..500 {
        let x = i as f64;
        let positions: Vec<DVec3> = (0..32).map(|b| DVec3::new(x, b as f64, 0.0)).collect();
        controller
            .handle_message(StreamMessage::Binary(translation_frame(&positions)), Instant::now())
            .unwrap();
    }
    controller.disconnect().await.unwrap();

    assert!(reader.join().unwrap() > 0);
}

#[tokio::test]
async fn test_recover_after_stream_failure() {
    let (mut controller, api, connector) = streaming(RecordingApi::new()).await;
    let mut events = controller.subscribe();

    connector
        .take_feed()
        .unwrap()
        .fail("connection reset")
        .await
        .unwrap();
    assert!(controller.pump().await.unwrap_err().is_transport());
    assert!(matches!(
        events.try_recv().unwrap(),
        LifecycleEvent::Error {
            during: LifecycleState::Streaming,
            ..
        }
    ));

    // No automatic retry: the supervisor resets and reconnects
    assert_eq!(api.count(ApiOp::Create), 1);
    controller.reset().unwrap();
    controller
        .connect(SessionRequest::new("e2e-2", SessionType::Fk))
        .await
        .unwrap();

    assert!(controller.is_streaming());
    assert_eq!(connector.connections(), 2);
    assert!(matches!(events.try_recv().unwrap(), LifecycleEvent::SessionCreated { .. }));
    assert!(matches!(
        events.try_recv().unwrap(),
        LifecycleEvent::SkeletonReady { bone_count: 2, .. }
    ));
}
