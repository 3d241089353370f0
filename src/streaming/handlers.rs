use crate::controller::ControlCommand;
use crate::error::StreamError;
use crate::events::{ClickcamEvent, EventFilter, EventReceiver, NotificationKind};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use std::convert::Infallible;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::multipart::CONTENT_TYPE;
use super::server::ServerState;
use super::session::StreamSession;

/// Ask the control loop something and wait for its answer
async fn request<T>(
    commands: &mpsc::Sender<ControlCommand>,
    command: impl FnOnce(oneshot::Sender<T>) -> ControlCommand,
) -> Result<T, StreamError> {
    let (reply, response) = oneshot::channel();
    commands
        .send(command(reply))
        .await
        .map_err(|_| StreamError::ControllerUnavailable)?;
    response.await.map_err(|_| StreamError::ControllerUnavailable)
}

fn unavailable(error: StreamError) -> Response {
    warn!("Request refused: {}", error);
    (StatusCode::SERVICE_UNAVAILABLE, error.to_string()).into_response()
}

/// Handler for the MJPEG stream endpoint
pub async fn mjpeg_stream_handler(State(state): State<ServerState>) -> Response {
    let (session, mut parts) = StreamSession::channel(1);

    let session_id = match request(&state.commands, |reply| ControlCommand::AttachStream {
        session,
        reply,
    })
    .await
    {
        Ok(Ok(id)) => id,
        Ok(Err(e)) | Err(e) => return unavailable(e),
    };

    info!("MJPEG client {} connected", session_id);

    let shutdown = state.shutdown.clone();
    let stream = async_stream::stream! {
        loop {
            let part = tokio::select! {
                _ = shutdown.cancelled() => None,
                part = parts.recv() => part,
            };
            match part {
                Some(part) => yield Ok::<_, Infallible>(part),
                None => break,
            }
        }
        debug!("MJPEG client {} stream ended", session_id);
    };

    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, private"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Handler for the last captured photo
pub async fn snapshot_handler(State(state): State<ServerState>) -> Response {
    match request(&state.commands, |reply| ControlCommand::Snapshot { reply }).await {
        Ok(Some(snapshot)) => {
            debug!(
                "Serving snapshot of frame {} ({} bytes)",
                snapshot.frame_id,
                snapshot.data.len()
            );
            (
                [
                    (header::CONTENT_TYPE, "image/jpeg"),
                    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
                    (header::PRAGMA, "no-cache"),
                    (header::EXPIRES, "0"),
                ],
                snapshot.data,
            )
                .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "No photo captured yet").into_response(),
        Err(e) => unavailable(e),
    }
}

/// Server-sent notification feed
pub async fn events_handler(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut receiver = EventReceiver::new(
        state.event_bus.subscribe(),
        EventFilter::EventTypes(vec!["notification"]),
        "sse_client".to_string(),
    );
    let greeting = state.greeting;
    let shutdown = state.shutdown;

    info!("Notification listener connected");

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(
            Event::default()
                .retry(Duration::from_millis(1000))
                .data(greeting),
        );

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                event = receiver.recv() => Some(event),
            };
            match next {
                Some(Ok(ClickcamEvent::Notification { kind, timestamp })) => {
                    let id = timestamp
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_millis();
                    yield Ok(
                        Event::default()
                            .event("message")
                            .id(id.to_string())
                            .data(kind.label()),
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            }
        }
        debug!("Notification listener disconnected");
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handler for health check endpoint
pub async fn health_handler(State(state): State<ServerState>) -> Response {
    match request(&state.commands, |reply| ControlCommand::Status { reply }).await {
        Ok(status) => {
            let health_info = serde_json::json!({
                "status": "healthy",
                "controller": status,
                "server_info": {
                    "subscribers": state.event_bus.subscriber_count(),
                }
            });
            (StatusCode::OK, Json(health_info)).into_response()
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unavailable",
                "error": e.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Monitor page: live stream, last photo and a notification log
pub async fn index_handler() -> Html<String> {
    let classes = [
        NotificationKind::PhotoCaptured,
        NotificationKind::VideoStart,
        NotificationKind::VideoStop,
    ]
    .iter()
    .map(|kind| format!("\"{}\": \"{}\"", kind.label(), kind.css_class()))
    .collect::<Vec<_>>()
    .join(", ");

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Clickcam</title>
    <style>
        :root {{ color-scheme: dark; }}
        body {{ margin: 0; background: #111; color: #eee; font-family: sans-serif; }}
        main {{ display: flex; flex-wrap: wrap; gap: 1rem; padding: 1rem; }}
        img {{ max-width: 48vw; background: #000; }}
        #log {{ list-style: none; padding: 0; font-family: monospace; }}
        .click {{ color: #6cf; }}
        .hold-start {{ color: #6f6; }}
        .hold-stop {{ color: #f66; }}
    </style>
</head>
<body>
    <main>
        <img id="stream" src="/stream" alt="Live stream">
        <img id="snapshot" src="/snapshot.jpg" alt="Last photo">
        <ul id="log"></ul>
    </main>
    <script>
        const classes = {{ {classes} }};
        const log = document.getElementById("log");
        const source = new EventSource("/events");
        source.onmessage = (event) => {{
            const item = document.createElement("li");
            item.textContent = new Date().toLocaleTimeString() + " " + event.data;
            item.className = classes[event.data] || "";
            log.prepend(item);
            if (event.data === "PHOTO CAPTURE") {{
                document.getElementById("snapshot").src = "/snapshot.jpg?t=" + Date.now();
            }}
        }};
    </script>
</body>
</html>
"#,
        classes = classes,
    );

    Html(html)
}
