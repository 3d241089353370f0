use crate::{
    config::StreamConfig,
    controller::ControlCommand,
    error::{ClickcamError, Result, StreamError},
    events::EventBus,
};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use super::handlers::{
    events_handler, health_handler, index_handler, mjpeg_stream_handler, snapshot_handler,
};

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) commands: mpsc::Sender<ControlCommand>,
    pub(crate) event_bus: Arc<EventBus>,
    pub(crate) greeting: String,
    /// Ends long-lived responses so graceful shutdown can finish
    pub(crate) shutdown: CancellationToken,
}

/// Build the HTTP routes
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(mjpeg_stream_handler))
        .route("/snapshot.jpg", get(snapshot_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// HTTP front end: MJPEG stream, snapshot, notifications and health
pub struct StreamServer {
    pub(crate) config: StreamConfig,
    pub(crate) commands: mpsc::Sender<ControlCommand>,
    pub(crate) event_bus: Arc<EventBus>,
}

impl StreamServer {
    pub fn new(
        config: StreamConfig,
        commands: mpsc::Sender<ControlCommand>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            commands,
            event_bus,
        }
    }

    /// Bind the listener and serve in the background until `cancel` fires.
    /// Returns the bound address.
    pub async fn start(
        self,
        cancel: CancellationToken,
    ) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let state = ServerState {
            commands: self.commands,
            event_bus: self.event_bus,
            greeting: self.config.greeting.clone(),
            shutdown: cancel.clone(),
        };
        let app = router(state);

        let addr = self.config.bind_address();
        info!("Starting HTTP server on {}", addr);

        let listener =
            tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| StreamError::BindFailed {
                    address: addr.clone(),
                    source: e,
                })?;
        let local_addr = listener.local_addr()?;

        info!("HTTP server listening on {}", local_addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
                .map_err(|e| {
                    error!("HTTP server error: {}", e);
                    ClickcamError::Stream(StreamError::StartupFailed {
                        details: format!("Server error: {}", e),
                    })
                })?;

            info!("HTTP server stopped");
            Ok(())
        });

        Ok((local_addr, handle))
    }
}

/// Stream server builder for configuration
pub struct StreamServerBuilder {
    config: Option<StreamConfig>,
    commands: Option<mpsc::Sender<ControlCommand>>,
    event_bus: Option<Arc<EventBus>>,
}

impl StreamServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            commands: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Channel into the control loop
    pub fn commands(mut self, commands: mpsc::Sender<ControlCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<StreamServer> {
        let config = self.config.ok_or_else(|| {
            ClickcamError::Stream(StreamError::StartupFailed {
                details: "Stream configuration is required".to_string(),
            })
        })?;

        let commands = self.commands.ok_or_else(|| {
            ClickcamError::Stream(StreamError::StartupFailed {
                details: "Control command channel is required".to_string(),
            })
        })?;

        let event_bus = self.event_bus.ok_or_else(|| {
            ClickcamError::Stream(StreamError::StartupFailed {
                details: "Event bus is required".to_string(),
            })
        })?;

        Ok(StreamServer::new(config, commands, event_bus))
    }
}

impl Default for StreamServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
