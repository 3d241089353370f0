use crate::button::GestureEvent;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// User-facing notifications pushed to connected listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PhotoCaptured,
    VideoStart,
    VideoStop,
}

impl NotificationKind {
    /// Short label sent as the notification payload
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::PhotoCaptured => "PHOTO CAPTURE",
            NotificationKind::VideoStart => "VIDEO START",
            NotificationKind::VideoStop => "VIDEO STOP",
        }
    }

    /// CSS class used by the monitor page log
    pub fn css_class(&self) -> &'static str {
        match self {
            NotificationKind::PhotoCaptured => "click",
            NotificationKind::VideoStart => "hold-start",
            NotificationKind::VideoStop => "hold-stop",
        }
    }
}

/// Fire-and-forget delivery of notifications to whoever is listening.
///
/// Implementations must never block the caller and a failing listener must
/// not affect delivery to the others.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, timestamp: SystemTime);
}

/// Events that can occur in the clickcam system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClickcamEvent {
    /// The gesture classifier emitted an event
    Gesture {
        gesture: GestureEvent,
        timestamp: SystemTime,
    },
    /// A notification for connected listeners
    Notification {
        kind: NotificationKind,
        timestamp: SystemTime,
    },
    /// A photo capture was attempted and failed
    CaptureFailed { reason: String, timestamp: SystemTime },
    /// An MJPEG client attached to the relay
    StreamClientConnected { session_id: Uuid },
    /// An MJPEG client went away or was dropped
    StreamClientDisconnected { session_id: Uuid, frames_sent: u64 },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl ClickcamEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            ClickcamEvent::Gesture { timestamp, .. } => *timestamp,
            ClickcamEvent::Notification { timestamp, .. } => *timestamp,
            ClickcamEvent::CaptureFailed { timestamp, .. } => *timestamp,
            ClickcamEvent::StreamClientConnected { .. } => SystemTime::now(),
            ClickcamEvent::StreamClientDisconnected { .. } => SystemTime::now(),
            ClickcamEvent::SystemError { .. } => SystemTime::now(),
            ClickcamEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            ClickcamEvent::Gesture { gesture, .. } => format!("Gesture: {:?}", gesture),
            ClickcamEvent::Notification { kind, .. } => {
                format!("Notification: {}", kind.label())
            }
            ClickcamEvent::CaptureFailed { reason, .. } => {
                format!("Photo capture failed: {}", reason)
            }
            ClickcamEvent::StreamClientConnected { session_id } => {
                format!("Stream client {} connected", session_id)
            }
            ClickcamEvent::StreamClientDisconnected {
                session_id,
                frames_sent,
            } => {
                format!(
                    "Stream client {} disconnected after {} frames",
                    session_id, frames_sent
                )
            }
            ClickcamEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            ClickcamEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ClickcamEvent::Gesture { .. } => "gesture",
            ClickcamEvent::Notification { .. } => "notification",
            ClickcamEvent::CaptureFailed { .. } => "capture_failed",
            ClickcamEvent::StreamClientConnected { .. } => "stream_client_connected",
            ClickcamEvent::StreamClientDisconnected { .. } => "stream_client_disconnected",
            ClickcamEvent::SystemError { .. } => "system_error",
            ClickcamEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Event bus for component coordination using broadcast channels
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ClickcamEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ClickcamEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers.
    ///
    /// Never waits: a broadcast send only fails when nobody is subscribed,
    /// and subscribers that fall behind lag instead of applying backpressure.
    pub fn publish(&self, event: ClickcamEvent) -> Result<usize, EventBusError> {
        match &event {
            ClickcamEvent::Notification { kind, .. } => {
                info!("Notification: {}", kind.label());
            }
            ClickcamEvent::CaptureFailed { reason, .. } => {
                warn!("Photo capture failed: {}", reason);
            }
            ClickcamEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            ClickcamEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                trace!("Event: {}", event.description());
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Notifier for EventBus {
    fn notify(&self, kind: NotificationKind, timestamp: SystemTime) {
        // Zero listeners is the normal idle case, not an error
        if let Err(e) = self.publish(ClickcamEvent::Notification { kind, timestamp }) {
            debug!("Notification {} had no listeners: {}", kind.label(), e);
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &ClickcamEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver with filtering.
///
/// A lagging receiver skips the events it missed and keeps going, so one slow
/// listener never holds up the publisher or the other listeners.
pub struct EventReceiver {
    receiver: broadcast::Receiver<ClickcamEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<ClickcamEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<ClickcamEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let subscriber_count = event_bus
            .publish(ClickcamEvent::Notification {
                kind: NotificationKind::PhotoCaptured,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            ClickcamEvent::Notification { kind, .. } => {
                assert_eq!(kind, NotificationKind::PhotoCaptured);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_notify_without_listeners_does_not_fail() {
        let event_bus = EventBus::new(10);
        assert!(!event_bus.has_subscribers());

        event_bus.notify(NotificationKind::VideoStart, SystemTime::now());
    }

    #[tokio::test]
    async fn test_multiple_listeners_receive_notification() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.notify(NotificationKind::VideoStop, SystemTime::now());

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_listener_does_not_affect_others() {
        let event_bus = EventBus::new(10);
        let dropped = event_bus.subscribe();
        let mut kept = event_bus.subscribe();
        drop(dropped);

        event_bus.notify(NotificationKind::PhotoCaptured, SystemTime::now());

        let event = timeout(Duration::from_millis(100), kept.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type(), "notification");
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["notification"]),
            "test".to_string(),
        );

        event_bus
            .publish(ClickcamEvent::Gesture {
                gesture: GestureEvent::PressStart,
                timestamp: SystemTime::now(),
            })
            .unwrap();
        event_bus.notify(NotificationKind::VideoStart, SystemTime::now());

        let received = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        match received {
            ClickcamEvent::Notification { kind, .. } => {
                assert_eq!(kind, NotificationKind::VideoStart);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lagging_receiver_keeps_receiving() {
        let event_bus = EventBus::new(2);
        let mut receiver = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::All,
            "slow".to_string(),
        );

        for _ in 0..5 {
            event_bus.notify(NotificationKind::PhotoCaptured, SystemTime::now());
        }
        event_bus.notify(NotificationKind::VideoStart, SystemTime::now());

        // The receiver skips what it missed instead of erroring out
        let mut kinds = Vec::new();
        for _ in 0..2 {
            match receiver.recv().await.unwrap() {
                ClickcamEvent::Notification { kind, .. } => kinds.push(kind),
                other => panic!("Unexpected event: {:?}", other),
            }
        }
        assert_eq!(
            kinds,
            vec![NotificationKind::PhotoCaptured, NotificationKind::VideoStart]
        );
    }

    #[test]
    fn test_notification_labels() {
        assert_eq!(NotificationKind::PhotoCaptured.label(), "PHOTO CAPTURE");
        assert_eq!(NotificationKind::VideoStart.label(), "VIDEO START");
        assert_eq!(NotificationKind::VideoStop.label(), "VIDEO STOP");
        assert_eq!(NotificationKind::VideoStart.css_class(), "hold-start");
    }

    #[test]
    fn test_event_properties() {
        let event = ClickcamEvent::SystemError {
            component: "camera".to_string(),
            error: "pipeline stalled".to_string(),
        };

        assert_eq!(event.event_type(), "system_error");
        assert!(event.description().contains("pipeline stalled"));
    }
}
