use crate::capture::CaptureStats;
use crate::frame::FrameAccounting;
use crate::streaming::StreamStats;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of the controller, served by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub gesture_state: &'static str,
    pub streaming: bool,
    pub cache_occupied: bool,
    pub cached_frame_id: Option<u64>,
    pub captured_at: Option<DateTime<Utc>>,
    pub active_sessions: usize,
    pub max_clients: usize,
    pub frame_source: String,
    pub frames: FrameAccounting,
    pub capture: CaptureStats,
    pub stream: StreamStats,
    pub ticks: u64,
}

impl ControllerStatus {
    /// One-line summary for periodic logging
    pub fn summary(&self) -> String {
        format!(
            "state={} streaming={} cached={} clients={}/{} frames out={} captures={} relayed={} ({:.0}%)",
            self.gesture_state,
            self.streaming,
            self.cache_occupied,
            self.active_sessions,
            self.max_clients,
            self.frames.outstanding,
            self.capture.captures,
            self.stream.frames_relayed,
            self.stream.efficiency() * 100.0
        )
    }
}
