pub mod app;
pub mod button;
pub mod camera;
pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod streaming;

pub use app::{ClickcamOrchestrator, ComponentState, ShutdownReason};
pub use button::{ButtonInput, ButtonLevel, GestureClassifier, GestureEvent, GestureState};
pub use camera::{FrameSourceBuilder, SyntheticFrameSource};
pub use capture::{CaptureCache, CaptureOutcome, CaptureStats};
pub use config::ClickcamConfig;
pub use controller::{CaptureController, ControlCommand, ControlLoop, ControllerStatus};
pub use error::{ClickcamError, Result};
pub use events::{ClickcamEvent, EventBus, EventFilter, EventReceiver, NotificationKind, Notifier};
pub use frame::{Frame, FrameAccounting, FrameLease, FrameSource};
pub use streaming::{StreamRelay, StreamSession, StreamStats};

#[cfg(feature = "streaming")]
pub use streaming::{StreamServer, StreamServerBuilder};
