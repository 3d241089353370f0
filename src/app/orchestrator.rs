use super::types::{ComponentState, ShutdownReason};
use crate::button::{ButtonInput, ButtonInputBuilder, ButtonSetup, KeyboardButton};
use crate::camera::FrameSourceBuilder;
use crate::config::ClickcamConfig;
use crate::controller::{CaptureController, ControlCommand};
use crate::error::Result;
use crate::events::EventBus;
use crate::frame::FrameSource;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the HTTP-to-control-loop command queue
const COMMAND_QUEUE: usize = 32;

/// Main application coordinator that manages all system components
pub struct ClickcamOrchestrator {
    pub(super) config: ClickcamConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) frame_source: Arc<dyn FrameSource>,

    // Components
    pub(super) button: Option<Box<dyn ButtonInput>>,
    pub(super) keyboard: Option<KeyboardButton>,
    pub(super) commands_tx: mpsc::Sender<ControlCommand>,
    pub(super) commands_rx: Option<mpsc::Receiver<ControlCommand>>,
    pub(super) control_task: Option<JoinHandle<CaptureController>>,
    pub(super) server_task: Option<JoinHandle<Result<()>>>,
    pub(super) server_addr: Option<SocketAddr>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl ClickcamOrchestrator {
    /// Create a new orchestrator, opening the configured camera and button
    pub async fn new(config: ClickcamConfig) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));

        let frame_source = FrameSourceBuilder::new()
            .config(config.camera.clone())
            .build()?;

        let button = ButtonInputBuilder::new()
            .config(config.button.clone())
            .event_bus(Arc::clone(&event_bus))
            .build()?;

        Ok(Self::with_components(
            config,
            event_bus,
            frame_source,
            button,
        ))
    }

    /// Create an orchestrator around already constructed components
    pub fn with_components(
        config: ClickcamConfig,
        event_bus: Arc<EventBus>,
        frame_source: Arc<dyn FrameSource>,
        button: ButtonSetup,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            event_bus,
            frame_source,
            button: Some(button.input),
            keyboard: button.keyboard,
            commands_tx,
            commands_rx: Some(commands_rx),
            control_task: None,
            server_task: None,
            server_addr: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Sender for requests to the control loop
    pub fn commands(&self) -> mpsc::Sender<ControlCommand> {
        self.commands_tx.clone()
    }

    /// Address the HTTP server is listening on, once started
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }
}
