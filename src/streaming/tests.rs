use super::*;
use crate::button::{SimulatedButton, SimulatedButtonHandle};
use crate::camera::SyntheticFrameSource;
use crate::config::ClickcamConfig;
use crate::controller::{CaptureController, ControlCommand, ControlLoop};
use crate::error::StreamError;
use crate::events::{ClickcamEvent, EventBus};
use crate::frame::{Frame, FrameSource};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn source(pool: usize) -> (Arc<SyntheticFrameSource>, Arc<dyn FrameSource>) {
    let synthetic = Arc::new(SyntheticFrameSource::new((64, 48), pool));
    let source: Arc<dyn FrameSource> = synthetic.clone();
    (synthetic, source)
}

fn test_frame() -> Frame {
    Frame::new(
        1,
        SystemTime::now(),
        Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]),
        2,
        2,
    )
}

#[tokio::test]
async fn test_session_send_and_disconnect() {
    let (mut session, mut rx) = StreamSession::channel(2);
    let frame = test_frame();

    let written = session
        .send_frame(&frame, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(written, encode_part(frame.data()).len() as u64);
    assert_eq!(rx.recv().await.unwrap(), encode_part(frame.data()));
    assert_eq!(session.frames_sent(), 1);

    drop(rx);
    assert!(session.is_closed());
    match session.send_frame(&frame, Duration::from_millis(50)).await {
        Err(StreamError::ClientDisconnected) => {}
        other => panic!("Expected disconnect, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_write_timeout() {
    let (mut session, _rx) = StreamSession::channel(1);
    let frame = test_frame();

    session
        .send_frame(&frame, Duration::from_millis(20))
        .await
        .unwrap();

    // Nobody drains the channel
    match session.send_frame(&frame, Duration::from_millis(20)).await {
        Err(StreamError::WriteTimeout { timeout_ms }) => assert_eq!(timeout_ms, 20),
        other => panic!("Expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_relay_idle_until_streaming() {
    let (_, source) = source(2);
    let mut relay = StreamRelay::new(2, Duration::from_millis(50));
    let (session, mut rx) = StreamSession::channel(4);
    relay.attach(session).unwrap();

    relay.pump(&source).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(source.accounting().acquired, 0);

    assert!(relay.start());
    assert!(!relay.start());
    relay.pump(&source).await;
    assert!(rx.try_recv().is_ok());
    assert!(source.accounting().is_balanced());

    assert!(relay.stop());
    relay.pump(&source).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_relay_without_clients_acquires_nothing() {
    let (_, source) = source(2);
    let mut relay = StreamRelay::new(2, Duration::from_millis(50));
    relay.start();

    relay.pump(&source).await;
    assert_eq!(source.accounting().acquired, 0);
}

#[tokio::test]
async fn test_relay_slow_client_is_dropped() {
    let (_, source) = source(2);
    let mut relay = StreamRelay::new(2, Duration::from_millis(20));
    let (slow, _slow_rx) = StreamSession::channel(1);
    let (fast, mut fast_rx) = StreamSession::channel(1);
    relay.attach(slow).unwrap();
    relay.attach(fast).unwrap();
    relay.start();

    relay.pump(&source).await;
    fast_rx.recv().await.unwrap();

    let ended = relay.pump(&source).await;
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].frames_sent, 1);
    assert_eq!(relay.active_sessions(), 1);
    assert!(fast_rx.recv().await.is_some());

    let stats = relay.stats();
    assert_eq!(stats.write_failures, 1);
    assert_eq!(stats.frames_relayed, 2);
    assert_eq!(stats.sessions_closed, 1);
    assert!(source.accounting().is_balanced());
}

#[tokio::test]
async fn test_relay_stalled_clients_time_out_together() {
    let (_, source) = source(2);
    let mut relay = StreamRelay::new(4, Duration::from_millis(100));
    let frame = test_frame();

    let mut stalled_rxs = Vec::new();
    for _ in 0..3 {
        let (mut stalled, rx) = StreamSession::channel(1);
        stalled
            .send_frame(&frame, Duration::from_millis(10))
            .await
            .unwrap();
        relay.attach(stalled).unwrap();
        stalled_rxs.push(rx);
    }
    let (healthy, mut healthy_rx) = StreamSession::channel(1);
    relay.attach(healthy).unwrap();
    relay.start();

    let started = std::time::Instant::now();
    let ended = relay.pump(&source).await;

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(ended.len(), 3);
    assert_eq!(relay.active_sessions(), 1);
    assert!(healthy_rx.try_recv().is_ok());
    assert_eq!(relay.stats().write_failures, 3);
    assert!(source.accounting().is_balanced());
}

#[tokio::test]
async fn test_relay_skips_tick_without_frame() {
    let (synthetic, source) = source(2);
    let mut relay = StreamRelay::new(1, Duration::from_millis(20));
    let (session, mut rx) = StreamSession::channel(1);
    relay.attach(session).unwrap();
    relay.start();

    synthetic.set_available(false);
    let ended = relay.pump(&source).await;

    assert!(ended.is_empty());
    assert!(rx.try_recv().is_err());
    assert_eq!(relay.stats().skipped_ticks, 1);
    assert_eq!(relay.active_sessions(), 1);
}

#[tokio::test]
async fn test_relay_client_limit_frees_closed_slots() {
    let mut relay = StreamRelay::new(1, Duration::from_millis(20));
    let (first, first_rx) = StreamSession::channel(1);
    relay.attach(first).unwrap();

    let (second, _second_rx) = StreamSession::channel(1);
    assert!(matches!(
        relay.attach(second),
        Err(StreamError::TooManyClients { max: 1 })
    ));

    drop(first_rx);
    let (third, _third_rx) = StreamSession::channel(1);
    assert!(relay.attach(third).is_ok());
    assert_eq!(relay.stats().rejected_clients, 1);
}

#[test]
fn test_relay_close_all() {
    let mut relay = StreamRelay::new(2, Duration::from_millis(20));
    let (a, _a_rx) = StreamSession::channel(1);
    let (b, _b_rx) = StreamSession::channel(1);
    relay.attach(a).unwrap();
    relay.attach(b).unwrap();

    assert_eq!(relay.close_all().len(), 2);
    assert_eq!(relay.active_sessions(), 0);
}

struct TestApp {
    router: Router,
    button: SimulatedButtonHandle,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
}

impl TestApp {
    fn start() -> Self {
        let config = ClickcamConfig::default();
        let (_, source) = source(config.camera.frame_pool);
        let event_bus = Arc::new(EventBus::new(64));
        let controller =
            CaptureController::new(&config, source, event_bus.clone(), event_bus.clone());

        let (button, handle) = SimulatedButton::new();
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let control = ControlLoop::new(
            controller,
            Box::new(button),
            commands_rx,
            event_bus.clone(),
            Duration::from_millis(5),
        );
        tokio::spawn(control.run(cancel.clone()));

        let router = router(ServerState {
            commands: commands_tx,
            event_bus: event_bus.clone(),
            greeting: config.stream.greeting,
            shutdown: cancel.clone(),
        });

        Self {
            router,
            button: handle,
            event_bus,
            cancel,
        }
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn click(&self) {
        self.button.press();
        tokio::time::sleep(Duration::from_millis(40)).await;
        self.button.release();
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[tokio::test]
async fn test_snapshot_endpoint() {
    let app = TestApp::start();

    let response = app.get("/snapshot.jpg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.click().await;

    let response = app.get("/snapshot.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate"
    );
    assert_eq!(headers[header::PRAGMA], "no-cache");
    assert_eq!(headers[header::EXPIRES], "0");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_stream_endpoint_and_client_limit() {
    let app = TestApp::start();

    let first = app.get("/stream").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        first.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    let second = app.get("/stream").await;
    assert_eq!(second.status(), StatusCode::OK);

    let third = app.get("/stream").await;
    assert_eq!(third.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Hold the button to start streaming and read the first part
    app.button.press();
    let mut body = first.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
    app.button.release();
}

#[tokio::test]
async fn test_events_endpoint_greets_then_notifies() {
    let app = TestApp::start();

    let response = app.get("/events").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let mut body = response.into_body().into_data_stream();
    let greeting = body.next().await.unwrap().unwrap();
    let greeting = String::from_utf8_lossy(&greeting);
    assert!(greeting.contains("data: Web Client Connected"));
    assert!(greeting.contains("retry:1000"));

    app.event_bus
        .publish(ClickcamEvent::SystemError {
            component: "test".to_string(),
            error: "ignored by listeners".to_string(),
        })
        .unwrap();
    app.click().await;

    let message = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let message = String::from_utf8_lossy(&message);
    assert!(message.contains("event: message"));
    assert!(message.contains("data: PHOTO CAPTURE"));
    assert!(message.contains("id: "));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::start();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["controller"]["gesture_state"], "idle");
    assert_eq!(json["controller"]["streaming"], false);
    assert_eq!(json["controller"]["frame_source"], "synthetic");
}

#[tokio::test]
async fn test_endpoints_without_control_loop() {
    let (commands_tx, commands_rx) = mpsc::channel::<ControlCommand>(1);
    drop(commands_rx);
    let router = router(ServerState {
        commands: commands_tx,
        event_bus: Arc::new(EventBus::new(8)),
        greeting: "hello".to_string(),
        shutdown: CancellationToken::new(),
    });

    for uri in ["/health", "/snapshot.jpg", "/stream"] {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
    }
}

#[tokio::test]
async fn test_index_page() {
    let app = TestApp::start();

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8_lossy(&body);
    assert!(page.contains("new EventSource(\"/events\")"));
    assert!(page.contains("\"VIDEO START\": \"hold-start\""));
    assert!(page.contains("src=\"/stream\""));
}

#[tokio::test]
async fn test_server_builder_requires_parts() {
    assert!(StreamServerBuilder::new().build().is_err());

    let (commands_tx, _commands_rx) = mpsc::channel(1);
    let mut config = ClickcamConfig::default().stream;
    config.ip = "127.0.0.1".to_string();
    config.port = 0;

    let server = StreamServerBuilder::new()
        .config(config)
        .commands(commands_tx)
        .event_bus(Arc::new(EventBus::new(8)))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let (addr, handle) = server.start(cancel.clone()).await.unwrap();
    assert_ne!(addr.port(), 0);

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_events_end_when_server_shuts_down() {
    let (commands_tx, _commands_rx) = mpsc::channel::<ControlCommand>(1);
    let shutdown = CancellationToken::new();
    let router = router(ServerState {
        commands: commands_tx,
        event_bus: Arc::new(EventBus::new(8)),
        greeting: "hello".to_string(),
        shutdown: shutdown.clone(),
    });

    let response = router
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    let greeting = body.next().await.unwrap().unwrap();
    assert!(String::from_utf8_lossy(&greeting).contains("data: hello"));

    shutdown.cancel();

    let end = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap();
    assert!(end.is_none());
}
