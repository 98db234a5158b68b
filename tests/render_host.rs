//! Render host worker tests using a scripted in-memory engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use globeshot::bridge::{RenderBridge, RenderResult};
use globeshot::{Engine, Error, HostConfig, RenderHost, ViewpointRequest};

/// Behaviour is picked by the scene URL:
/// - `fake://broken-launch` fails `new`
/// - `fake://no-render-function` fails `load_scene`
/// - `fake://rejecting` rejects every invocation
/// - anything else echoes the invocation back as a data URI after `delay`
struct FakeEngine {
    scene: String,
    delay: Duration,
}

impl Engine for FakeEngine {
    fn new(config: HostConfig) -> globeshot::Result<Self> {
        if config.scene_url == "fake://broken-launch" {
            return Err(Error::InitializationError("no browser".into()));
        }
        Ok(Self { scene: config.scene_url, delay: Duration::from_millis(config.load_timeout_ms) })
    }

    fn load_scene(&mut self, url: &str) -> globeshot::Result<()> {
        if url == "fake://no-render-function" {
            return Err(Error::LoadError("getImg was not defined".into()));
        }
        Ok(())
    }

    fn evaluate_async(&mut self, script: &str) -> globeshot::Result<String> {
        if self.scene == "fake://rejecting" {
            return Err(Error::Rejected("Error: camera flight interrupted".into()));
        }
        std::thread::sleep(self.delay);
        let payload = base64::engine::general_purpose::STANDARD.encode(script);
        Ok(format!("data:image/png;base64,{}", payload))
    }

    fn close(self) -> globeshot::Result<()> {
        Ok(())
    }
}

// `load_timeout_ms` doubles as the fake's per-render delay
fn config(scene: &str, delay_ms: u64) -> HostConfig {
    HostConfig { scene_url: scene.to_string(), load_timeout_ms: delay_ms, ..Default::default() }
}

#[tokio::test]
async fn launch_failure_is_reported() {
    let err = RenderHost::start::<FakeEngine>(config("fake://broken-launch", 0)).await.err().unwrap();
    assert!(matches!(err, Error::InitializationError(_)));
}

#[tokio::test]
async fn scene_load_failure_is_reported() {
    let err = RenderHost::start::<FakeEngine>(config("fake://no-render-function", 0))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::LoadError(_)));
}

#[tokio::test]
async fn render_round_trips_through_worker() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 0)).await.unwrap();
    let uri = host.render("getImg(1,2,3,0,-1,0);").await.unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
    host.close().await.unwrap();
}

#[tokio::test]
async fn rejection_reaches_bridge_verbatim() {
    let host = RenderHost::start::<FakeEngine>(config("fake://rejecting", 0)).await.unwrap();
    let bridge = RenderBridge::new(Arc::new(host.clone()), Duration::from_secs(5));

    let result = bridge.render(&ViewpointRequest::at(1.0, 2.0, 3.0)).await;
    assert_eq!(result, RenderResult::Failure { message: "Error: camera flight interrupted".into() });

    // the host keeps serving after a failed render
    let again = bridge.render(&ViewpointRequest::at(1.0, 2.0, 3.0)).await;
    assert!(matches!(again, RenderResult::Failure { .. }));
    host.close().await.unwrap();
}

#[tokio::test]
async fn bridge_decodes_worker_output() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 0)).await.unwrap();
    let bridge = RenderBridge::new(Arc::new(host.clone()), Duration::from_secs(5));

    let result = bridge.render(&ViewpointRequest::at(32.5, -117.0, 5000.0)).await;
    assert_eq!(
        result,
        RenderResult::Success {
            image_bytes: b"getImg(32.5,-117,5000,0,-1,0);".to_vec(),
            mime_type: "image/png".into(),
        }
    );
    host.close().await.unwrap();
}

#[tokio::test]
async fn renders_are_serialized_in_submission_order() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 100)).await.unwrap();

    let started = Instant::now();
    let (a, b, c) = tokio::join!(host.render("a"), host.render("b"), host.render("c"));
    let elapsed = started.elapsed();

    assert_eq!(a.unwrap(), "data:image/png;base64,YQ==");
    assert_eq!(b.unwrap(), "data:image/png;base64,Yg==");
    assert_eq!(c.unwrap(), "data:image/png;base64,Yw==");
    // one at a time: three 100ms renders cannot overlap
    assert!(elapsed >= Duration::from_millis(300), "renders overlapped: {:?}", elapsed);
    host.close().await.unwrap();
}

#[tokio::test]
async fn slow_render_times_out_without_wedging_the_host() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 300)).await.unwrap();
    let bridge = RenderBridge::new(Arc::new(host.clone()), Duration::from_millis(50));

    let result = bridge.render(&ViewpointRequest::at(1.0, 2.0, 3.0)).await;
    assert_eq!(result, RenderResult::Failure { message: "Operation timed out after 50ms".into() });

    // the worker finishes the abandoned render and picks up the next one
    let uri = host.render("next").await.unwrap();
    assert_eq!(uri, "data:image/png;base64,bmV4dA==");
    host.close().await.unwrap();
}

#[tokio::test]
async fn abandoned_queued_renders_are_skipped() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 100)).await.unwrap();
    let bridge = RenderBridge::new(Arc::new(host.clone()), Duration::from_millis(30));

    let views: Vec<_> = (0..5).map(|i| ViewpointRequest::at(i as f64, 0.0, 10.0)).collect();
    let results = futures::future::join_all(views.iter().map(|v| bridge.render(v))).await;
    assert!(results.iter().all(|r| matches!(r, RenderResult::Failure { .. })));

    // only the render already in progress may still run ahead of this one
    let started = Instant::now();
    let uri = host.render("next").await.unwrap();
    let waited = started.elapsed();

    assert_eq!(uri, "data:image/png;base64,bmV4dA==");
    assert!(waited < Duration::from_millis(350), "waited {:?} behind abandoned renders", waited);
    host.close().await.unwrap();
}

#[tokio::test]
async fn closed_host_refuses_renders() {
    let host = RenderHost::start::<FakeEngine>(config("fake://scene", 0)).await.unwrap();
    let handle = host.clone();
    host.close().await.unwrap();

    // give the worker a moment to drop its receiver
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = handle.render("getImg(1,2,3,0,-1,0);").await.unwrap_err();
    assert!(matches!(err, Error::Other(_)));
}
