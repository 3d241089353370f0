use super::command::ControlCommand;
use super::status::ControllerStatus;
use crate::button::{ButtonLevel, GestureClassifier, GestureEvent};
use crate::capture::{CaptureCache, CaptureOutcome};
use crate::config::ClickcamConfig;
use crate::events::{ClickcamEvent, EventBus, NotificationKind, Notifier};
use crate::frame::FrameSource;
use crate::streaming::{ClosedSession, StreamRelay};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

/// Owns all gesture, photo and stream state.
///
/// Everything here runs on the control loop's task; other tasks reach it
/// only through [`ControlCommand`]s.
pub struct CaptureController {
    classifier: GestureClassifier,
    cache: CaptureCache,
    relay: StreamRelay,
    source: Arc<dyn FrameSource>,
    notifier: Arc<dyn Notifier>,
    event_bus: Arc<EventBus>,
    ticks: u64,
}

impl CaptureController {
    pub fn new(
        config: &ClickcamConfig,
        source: Arc<dyn FrameSource>,
        notifier: Arc<dyn Notifier>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            classifier: GestureClassifier::new(config.button.hold_threshold()),
            cache: CaptureCache::new(config.capture.cooldown(), config.capture.flush_frames),
            relay: StreamRelay::new(config.stream.max_clients, config.stream.write_timeout()),
            source,
            notifier,
            event_bus,
            ticks: 0,
        }
    }

    /// One control cycle: classify the sampled level, react to the
    /// resulting gesture, then relay a frame if streaming.
    pub async fn tick(&mut self, level: ButtonLevel, now: Instant) -> Option<GestureEvent> {
        self.ticks += 1;

        let gesture = self.classifier.classify(level, now);
        if let Some(gesture) = gesture {
            self.handle_gesture(gesture, now).await;
        }

        let ended = self.relay.pump(&self.source).await;
        self.report_closed(ended);

        debug_assert!(
            !(self.cache.is_occupied() && self.relay.is_streaming()),
            "photo cached while streaming"
        );

        gesture
    }

    async fn handle_gesture(&mut self, gesture: GestureEvent, now: Instant) {
        let timestamp = SystemTime::now();
        let _ = self
            .event_bus
            .publish(ClickcamEvent::Gesture { gesture, timestamp });

        match gesture {
            GestureEvent::PressStart => {
                debug!("Button pressed");
            }
            GestureEvent::HoldConfirmed => {
                if self.cache.clear() {
                    debug!("Cached photo released for streaming");
                }
                self.relay.start();
                self.notifier.notify(NotificationKind::VideoStart, timestamp);
            }
            GestureEvent::ReleaseAsHoldStop => {
                self.relay.stop();
                self.notifier.notify(NotificationKind::VideoStop, timestamp);
            }
            GestureEvent::ReleaseAsClick => match self.cache.capture(&self.source, now).await {
                CaptureOutcome::Captured { .. } => {
                    self.notifier
                        .notify(NotificationKind::PhotoCaptured, SystemTime::now());
                }
                CaptureOutcome::CoolingDown { .. } => {}
                CaptureOutcome::Failed { error } => {
                    let _ = self.event_bus.publish(ClickcamEvent::CaptureFailed {
                        reason: error.to_string(),
                        timestamp,
                    });
                }
            },
        }
    }

    /// Apply a request from another task
    pub fn handle_command(&mut self, command: ControlCommand) {
        debug!("Handling {} command", command.name());

        match command {
            ControlCommand::AttachStream { session, reply } => {
                let result = self.relay.attach(session);
                if let Ok(session_id) = result {
                    let _ = self
                        .event_bus
                        .publish(ClickcamEvent::StreamClientConnected { session_id });
                }
                // A handler that gave up drops its receiver; the session is
                // pruned as closed on the next pump
                let _ = reply.send(result);
            }
            ControlCommand::Snapshot { reply } => {
                let _ = reply.send(self.cache.snapshot());
            }
            ControlCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    pub fn status(&self) -> ControllerStatus {
        let snapshot = self.cache.snapshot();

        ControllerStatus {
            gesture_state: self.classifier.state().name(),
            streaming: self.relay.is_streaming(),
            cache_occupied: self.cache.is_occupied(),
            cached_frame_id: snapshot.as_ref().map(|s| s.frame_id),
            captured_at: snapshot.map(|s| DateTime::<Utc>::from(s.timestamp)),
            active_sessions: self.relay.active_sessions(),
            max_clients: self.relay.max_clients(),
            frame_source: self.source.name().to_string(),
            frames: self.source.accounting(),
            capture: self.cache.stats(),
            stream: self.relay.stats(),
            ticks: self.ticks,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.relay.is_streaming()
    }

    pub fn has_cached_photo(&self) -> bool {
        self.cache.is_occupied()
    }

    /// Stop streaming, disconnect clients and give every frame back
    pub fn shutdown(&mut self) {
        self.relay.stop();
        let closed = self.relay.close_all();
        self.report_closed(closed);
        self.cache.clear();
        self.classifier.reset();

        let accounting = self.source.accounting();
        info!(
            "Controller stopped: {} frames acquired, {} released, {} outstanding",
            accounting.acquired, accounting.released, accounting.outstanding
        );
    }

    fn report_closed(&self, closed: Vec<ClosedSession>) {
        for session in closed {
            let _ = self
                .event_bus
                .publish(ClickcamEvent::StreamClientDisconnected {
                    session_id: session.id,
                    frames_sent: session.frames_sent,
                });
        }
    }
}
