use super::{ClickcamOrchestrator, ShutdownReason};
use crate::error::{ClickcamError, Result};
use crate::events::{ClickcamEvent, EventFilter, EventReceiver};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl ClickcamOrchestrator {
    /// Run until a signal or a shutdown request arrives, then shut down.
    /// Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        info!("Clickcam system is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| ClickcamError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| ClickcamError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.listen_for_shutdown_requests(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| ClickcamError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Clickcam system shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: &ShutdownSender) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let sender = Arc::clone(shutdown_sender);
            let cancel = self.cancellation_token.clone();
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    Some(()) = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        send_shutdown(&sender, ShutdownReason::Signal("SIGTERM")).await;
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let sender = Arc::clone(shutdown_sender);
        let cancel = self.cancellation_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                Ok(()) = signal::ctrl_c() => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    send_shutdown(&sender, ShutdownReason::Signal("SIGINT")).await;
                }
            }
        });
    }

    /// Turn a `ShutdownRequested` event (e.g. the quit key) into a shutdown
    fn listen_for_shutdown_requests(&self, shutdown_sender: &ShutdownSender) {
        let sender = Arc::clone(shutdown_sender);
        let cancel = self.cancellation_token.clone();
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "shutdown_listener".to_string(),
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                event = receiver.recv() => {
                    if let Ok(ClickcamEvent::ShutdownRequested { reason, .. }) = event {
                        send_shutdown(&sender, ShutdownReason::UserRequest(reason)).await;
                    }
                }
            }
        });
    }
}

async fn send_shutdown(sender: &ShutdownSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}
