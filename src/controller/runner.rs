use super::command::ControlCommand;
use super::core::CaptureController;
use crate::button::{ButtonInput, ButtonLevel};
use crate::events::{ClickcamEvent, EventBus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Repeated read failures are reported once per this many ticks
const READ_ERROR_REPORT_EVERY: u32 = 50;

/// Consecutive failed button reads
#[derive(Debug, Default)]
pub(super) struct ReadFailures(pub(super) u32);

impl ReadFailures {
    /// Count a failure. Returns true when this one should be reported.
    pub(super) fn record(&mut self) -> bool {
        let report = self.0 % READ_ERROR_REPORT_EVERY == 0;
        self.0 = self.0.saturating_add(1);
        report
    }

    /// Clear the streak, returning how long it was
    pub(super) fn reset(&mut self) -> u32 {
        std::mem::take(&mut self.0)
    }
}

/// The single task that samples the button and drives the controller
pub struct ControlLoop {
    controller: CaptureController,
    button: Box<dyn ButtonInput>,
    commands: mpsc::Receiver<ControlCommand>,
    event_bus: Arc<EventBus>,
    poll_interval: Duration,
    status_interval: Duration,
}

impl ControlLoop {
    pub fn new(
        controller: CaptureController,
        button: Box<dyn ButtonInput>,
        commands: mpsc::Receiver<ControlCommand>,
        event_bus: Arc<EventBus>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            button,
            commands,
            event_bus,
            poll_interval,
            status_interval: Duration::from_secs(60),
        }
    }

    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Tick until cancelled, then release everything and hand the
    /// controller back
    pub async fn run(mut self, cancel: CancellationToken) -> CaptureController {
        info!(
            "Control loop started: button '{}', tick {:?}",
            self.button.name(),
            self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_level = ButtonLevel::Low;
        let mut read_errors = ReadFailures::default();
        let mut last_status = Instant::now();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Control loop cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            while let Ok(command) = self.commands.try_recv() {
                self.controller.handle_command(command);
            }

            let level = match self.button.read_level() {
                Ok(level) => {
                    let failed = read_errors.reset();
                    if failed > 0 {
                        info!("Button readable again after {} failed reads", failed);
                    }
                    level
                }
                Err(e) => {
                    if read_errors.record() {
                        warn!("Button read failed, keeping {:?}: {}", last_level, e);
                        let _ = self.event_bus.publish(ClickcamEvent::SystemError {
                            component: "button".to_string(),
                            error: e.to_string(),
                        });
                    }
                    last_level
                }
            };
            last_level = level;

            self.controller.tick(level, Instant::now()).await;

            if last_status.elapsed() >= self.status_interval {
                info!("Status: {}", self.controller.status().summary());
                last_status = Instant::now();
            }
        }

        // Answer anything still queued so no handler waits forever
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.controller.handle_command(command);
        }

        self.controller.shutdown();
        info!("Control loop stopped");
        self.controller
    }
}
