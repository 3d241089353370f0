use crate::error::FrameSourceError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::SystemTime;

/// One compressed image from the camera, immutable once captured
#[derive(Clone)]
pub struct Frame {
    /// Identifier assigned by the frame source, unique per source
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    data: Bytes,
}

impl Frame {
    pub fn new(id: u64, timestamp: SystemTime, data: Bytes, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            width,
            height,
            data,
        }
    }

    /// Encoded JPEG bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check for the JPEG start-of-image marker
    pub fn is_jpeg(&self) -> bool {
        self.data.len() >= 2 && self.data[0] == 0xFF && self.data[1] == 0xD8
    }

    /// Shell left behind in a lease once its frame has gone back to the source
    fn released(id: u64) -> Self {
        Self {
            id,
            timestamp: SystemTime::UNIX_EPOCH,
            width: 0,
            height: 0,
            data: Bytes::new(),
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Acquire/release counters kept by every frame source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameAccounting {
    pub acquired: u64,
    pub released: u64,
    pub outstanding: usize,
    pub capacity: usize,
    pub double_releases: u64,
    pub unknown_releases: u64,
}

impl FrameAccounting {
    /// Every acquired frame has come back exactly once
    pub fn is_balanced(&self) -> bool {
        self.outstanding == 0
            && self.acquired == self.released
            && self.double_releases == 0
            && self.unknown_releases == 0
    }
}

/// Camera capability: hand out the most recent frame, take it back later.
///
/// `acquire` waits at most a short, source-specific bound. `release` must be
/// called exactly once per acquired frame; [`FrameLease`] does that on drop.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Bring the underlying device up
    async fn start(&self) -> Result<(), FrameSourceError> {
        Ok(())
    }

    /// Shut the underlying device down
    async fn stop(&self) -> Result<(), FrameSourceError> {
        Ok(())
    }

    /// Acquire the most recent frame, or fail if none is ready in time
    async fn acquire(&self) -> Result<Frame, FrameSourceError>;

    /// Return a frame previously handed out by `acquire`
    fn release(&self, frame: Frame);

    /// Snapshot of the acquire/release counters
    fn accounting(&self) -> FrameAccounting;
}

/// Owned handle to an acquired frame; returns the frame to its source on drop
pub struct FrameLease {
    frame: Frame,
    source: Arc<dyn FrameSource>,
}

impl FrameLease {
    /// Acquire a frame from `source` and tie its release to this handle
    pub async fn acquire(source: &Arc<dyn FrameSource>) -> Result<Self, FrameSourceError> {
        let frame = source.acquire().await?;
        Ok(Self {
            frame,
            source: Arc::clone(source),
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Release the frame now instead of at end of scope
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for FrameLease {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        let id = self.frame.id;
        let frame = std::mem::replace(&mut self.frame, Frame::released(id));
        self.source.release(frame);
    }
}

impl fmt::Debug for FrameLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLease")
            .field("frame", &self.frame)
            .field("source", &self.source.name())
            .finish()
    }
}
