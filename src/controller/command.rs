use super::status::ControllerStatus;
use crate::capture::Snapshot;
use crate::error::StreamError;
use crate::streaming::StreamSession;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Requests from other tasks, applied by the control loop between ticks
#[derive(Debug)]
pub enum ControlCommand {
    /// Hand a freshly connected MJPEG client to the relay
    AttachStream {
        session: StreamSession,
        reply: oneshot::Sender<Result<Uuid, StreamError>>,
    },
    /// Copy of the cached photo, if any
    Snapshot {
        reply: oneshot::Sender<Option<Snapshot>>,
    },
    /// Current controller status
    Status {
        reply: oneshot::Sender<ControllerStatus>,
    },
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::AttachStream { .. } => "attach_stream",
            ControlCommand::Snapshot { .. } => "snapshot",
            ControlCommand::Status { .. } => "status",
        }
    }
}
