use super::stats::CaptureStats;
use crate::error::FrameSourceError;
use crate::frame::{FrameLease, FrameSource};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// Result of a click-triggered capture attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A fresh frame now sits in the slot
    Captured { frame_id: u64, bytes: usize },
    /// Too soon after the previous capture; nothing changed
    CoolingDown { remaining: Duration },
    /// No frame could be acquired; the slot is empty
    Failed { error: FrameSourceError },
}

/// Copy of the cached photo handed to HTTP clients
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub frame_id: u64,
    pub timestamp: SystemTime,
    pub data: Bytes,
}

/// Single-slot cache holding the last photo taken.
///
/// The slot owns its frame through a [`FrameLease`], so replacing or clearing
/// it returns the previous frame to the source exactly once.
pub struct CaptureCache {
    slot: Option<FrameLease>,
    cooldown: Duration,
    flush_frames: u32,
    last_capture: Option<Instant>,
    stats: CaptureStats,
}

impl CaptureCache {
    pub fn new(cooldown: Duration, flush_frames: u32) -> Self {
        Self {
            slot: None,
            cooldown,
            flush_frames,
            last_capture: None,
            stats: CaptureStats::default(),
        }
    }

    /// Take a photo unless the previous one is younger than the cooldown.
    ///
    /// Stale frames still queued in the source are flushed first so the
    /// photo reflects the moment of the click.
    pub async fn capture(&mut self, source: &Arc<dyn FrameSource>, now: Instant) -> CaptureOutcome {
        if let Some(last) = self.last_capture {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                self.stats.cooldown_rejections += 1;
                let remaining = self.cooldown - elapsed;
                debug!("Capture ignored, cooling down for {:?}", remaining);
                return CaptureOutcome::CoolingDown { remaining };
            }
        }

        self.clear();

        for _ in 0..self.flush_frames {
            match FrameLease::acquire(source).await {
                Ok(stale) => {
                    debug!("Flushed stale frame {}", stale.id);
                    self.stats.flushed_frames += 1;
                }
                Err(e) => {
                    debug!("Flush stopped early: {}", e);
                    break;
                }
            }
        }

        match FrameLease::acquire(source).await {
            Ok(lease) => {
                let frame_id = lease.id;
                let bytes = lease.len();
                self.slot = Some(lease);
                self.last_capture = Some(now);
                self.stats.captures += 1;
                info!("Photo captured: frame {} ({} bytes)", frame_id, bytes);
                CaptureOutcome::Captured { frame_id, bytes }
            }
            Err(error) => {
                self.stats.failures += 1;
                warn!("Photo capture failed: {}", error);
                CaptureOutcome::Failed { error }
            }
        }
    }

    /// Release the cached frame, if any. Returns whether one was held.
    pub fn clear(&mut self) -> bool {
        match self.slot.take() {
            Some(lease) => {
                debug!("Releasing cached frame {}", lease.id);
                self.stats.evictions += 1;
                lease.release();
                true
            }
            None => false,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.slot.as_ref().map(|lease| Snapshot {
            frame_id: lease.id,
            timestamp: lease.timestamp,
            data: lease.data().clone(),
        })
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
