use super::{ClickcamOrchestrator, ComponentState};
use crate::error::{ClickcamError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl ClickcamOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel all background tasks
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Stop components in reverse dependency order
        for component in ["keyboard", "streaming", "controller", "camera"] {
            if let Err(e) = self.stop_component(component).await {
                error!("Error stopping {}: {}", component, e);
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop one component if it was started; unknown names are an error
    async fn stop_component(&mut self, component: &str) -> Result<()> {
        match self.get_component_state(component).await {
            Some(state) if state.needs_stop() => {}
            _ => return Ok(()),
        }

        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        let result = match component {
            "keyboard" => match &self.keyboard {
                Some(keyboard) => bounded(component, Duration::from_secs(2), keyboard.stop()).await,
                None => Ok(()),
            },
            "streaming" => match self.server_task.take() {
                Some(task) => {
                    let abort = task.abort_handle();
                    let result = bounded(component, Duration::from_secs(5), async move {
                        task.await.map_err(|e| {
                            ClickcamError::component("streaming", e.to_string())
                        })?
                    })
                    .await;
                    if result.is_err() {
                        abort.abort();
                    }
                    result
                }
                None => Ok(()),
            },
            "controller" => match self.control_task.take() {
                Some(task) => {
                    bounded(component, Duration::from_secs(5), async move {
                        let controller = task.await.map_err(|e| {
                            ClickcamError::component("controller", e.to_string())
                        })?;
                        let accounting = controller.status().frames;
                        if !accounting.is_balanced() {
                            warn!("Frame accounting unbalanced at shutdown: {:?}", accounting);
                        }
                        Ok(())
                    })
                    .await
                }
                None => Ok(()),
            },
            "camera" => {
                let source = std::sync::Arc::clone(&self.frame_source);
                bounded(component, Duration::from_secs(10), async move {
                    source.stop().await.map_err(ClickcamError::from)
                })
                .await
            }
            other => Err(ClickcamError::system(format!("Unknown component: {}", other))),
        };

        match &result {
            Ok(()) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
            }
        }

        result
    }
}

/// Run a stop future with a deadline
async fn bounded<F>(component: &str, limit: Duration, stop: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match timeout(limit, stop).await {
        Ok(result) => result,
        Err(_) => {
            error!("{} component stop timeout", component);
            Err(ClickcamError::system(format!(
                "{} component stop timeout",
                component
            )))
        }
    }
}
