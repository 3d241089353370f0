use super::{ClickcamOrchestrator, ComponentState};
use crate::controller::{CaptureController, ControlLoop};
use crate::error::{ClickcamError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

impl ClickcamOrchestrator {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing clickcam system components");

        let mut states = self.component_states.lock().await;
        states.insert("camera".to_string(), ComponentState::Stopped);
        states.insert("controller".to_string(), ComponentState::Stopped);

        #[cfg(feature = "streaming")]
        states.insert("streaming".to_string(), ComponentState::Stopped);

        // Only register keyboard component if the backend uses it
        if self.keyboard.is_some() {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all system components
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting clickcam system");

        // Camera first; the controller acquires from it on every tick
        self.set_component_state("camera", ComponentState::Starting)
            .await;
        if let Err(e) = self.frame_source.start().await {
            error!("Failed to start frame source: {}", e);
            self.set_component_state("camera", ComponentState::Failed)
                .await;
            return Err(e.into());
        }
        self.set_component_state("camera", ComponentState::Running)
            .await;
        info!("Frame source '{}' started", self.frame_source.name());

        self.start_controller().await?;

        #[cfg(feature = "streaming")]
        self.start_streaming().await?;

        if let Some(keyboard) = &self.keyboard {
            self.set_component_state("keyboard", ComponentState::Starting)
                .await;

            keyboard.start().await.map_err(|e| {
                error!("Failed to start keyboard button: {}", e);
                e
            })?;

            self.set_component_state("keyboard", ComponentState::Running)
                .await;
        }

        info!("Clickcam system started successfully");
        Ok(())
    }

    async fn start_controller(&mut self) -> Result<()> {
        self.set_component_state("controller", ComponentState::Starting)
            .await;

        let button = self
            .button
            .take()
            .ok_or_else(|| ClickcamError::system("Button input already in use"))?;
        let commands = self
            .commands_rx
            .take()
            .ok_or_else(|| ClickcamError::system("Control loop already started"))?;

        let controller = CaptureController::new(
            &self.config,
            Arc::clone(&self.frame_source),
            self.event_bus.clone(),
            Arc::clone(&self.event_bus),
        );

        let control_loop = ControlLoop::new(
            controller,
            button,
            commands,
            Arc::clone(&self.event_bus),
            self.config.button.poll_interval(),
        )
        .status_interval(Duration::from_secs(
            self.config.system.status_log_interval_secs,
        ));

        self.control_task = Some(tokio::spawn(
            control_loop.run(self.cancellation_token.child_token()),
        ));

        self.set_component_state("controller", ComponentState::Running)
            .await;
        info!(
            "Control loop running (hold threshold {:?}, cooldown {:?})",
            self.config.button.hold_threshold(),
            self.config.capture.cooldown()
        );
        Ok(())
    }

    #[cfg(feature = "streaming")]
    async fn start_streaming(&mut self) -> Result<()> {
        use crate::streaming::StreamServerBuilder;

        self.set_component_state("streaming", ComponentState::Starting)
            .await;

        let server = StreamServerBuilder::new()
            .config(self.config.stream.clone())
            .commands(self.commands_tx.clone())
            .event_bus(Arc::clone(&self.event_bus))
            .build()?;

        match server.start(self.cancellation_token.child_token()).await {
            Ok((addr, handle)) => {
                self.server_addr = Some(addr);
                self.server_task = Some(handle);
                self.set_component_state("streaming", ComponentState::Running)
                    .await;
                info!("HTTP server started on {}", addr);
                Ok(())
            }
            Err(e) => {
                error!("Failed to start HTTP server: {}", e);
                self.set_component_state("streaming", ComponentState::Failed)
                    .await;
                Err(e)
            }
        }
    }
}
