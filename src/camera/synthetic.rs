use super::pool::FramePool;
use crate::error::FrameSourceError;
use crate::frame::{Frame, FrameAccounting, FrameSource};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::SystemTime;
use tracing::{debug, info, trace};

/// Frame source that fabricates small JPEG frames from a bounded pool.
///
/// Stands in for a camera sensor on machines without one and in tests,
/// where outages can be injected with [`fail_next`](Self::fail_next) and
/// [`set_available`](Self::set_available).
pub struct SyntheticFrameSource {
    resolution: (u32, u32),
    pool: FramePool,
    available: AtomicBool,
    fail_remaining: AtomicU32,
}

impl SyntheticFrameSource {
    pub fn new(resolution: (u32, u32), pool_size: usize) -> Self {
        debug!(
            "Created synthetic frame source {}x{} with {} buffers",
            resolution.0, resolution.1, pool_size
        );

        Self {
            resolution,
            pool: FramePool::new(pool_size),
            available: AtomicBool::new(true),
            fail_remaining: AtomicU32::new(0),
        }
    }

    /// Make the next `count` acquires report no frame
    pub fn fail_next(&self, count: u32) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Simulate the sensor going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn start(&self) -> Result<(), FrameSourceError> {
        info!(
            "Synthetic frame source ready ({}x{}, {} buffers)",
            self.resolution.0,
            self.resolution.1,
            self.pool.capacity()
        );
        Ok(())
    }

    async fn acquire(&self) -> Result<Frame, FrameSourceError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(FrameSourceError::unavailable("synthetic sensor offline"));
        }

        if self.take_injected_failure() {
            return Err(FrameSourceError::unavailable("injected frame drop"));
        }

        let id = self.pool.checkout()?;
        let (width, height) = self.resolution;
        let data = synthetic_jpeg(width, height, id);

        trace!(
            "Generated synthetic frame {} ({}x{}, {} bytes)",
            id,
            width,
            height,
            data.len()
        );

        Ok(Frame::new(id, SystemTime::now(), data, width, height))
    }

    fn release(&self, frame: Frame) {
        self.pool.checkin(frame.id);
    }

    fn accounting(&self) -> FrameAccounting {
        self.pool.accounting()
    }
}

/// Build a structurally valid baseline JPEG header/trailer around a comment
/// carrying the frame sequence number, so consecutive frames differ.
pub fn synthetic_jpeg(width: u32, height: u32, sequence: u64) -> Bytes {
    let mut jpeg = Vec::with_capacity(256);

    // SOI + APP0 (JFIF)
    jpeg.extend_from_slice(&[0xFF, 0xD8]);
    jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    jpeg.extend_from_slice(b"JFIF\0");
    jpeg.extend_from_slice(&[0x01, 0x01, 0x01, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00]);

    // COM
    let comment = format!("clickcam frame {}", sequence);
    let comment_len = (comment.len() + 2) as u16;
    jpeg.extend_from_slice(&[0xFF, 0xFE]);
    jpeg.extend_from_slice(&comment_len.to_be_bytes());
    jpeg.extend_from_slice(comment.as_bytes());

    // SOF0
    jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    // SOF stores 16-bit dimensions; config validation keeps us in range
    let height = u16::try_from(height).unwrap_or(u16::MAX);
    let width = u16::try_from(width).unwrap_or(u16::MAX);
    jpeg.extend_from_slice(&height.to_be_bytes());
    jpeg.extend_from_slice(&width.to_be_bytes());
    jpeg.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);

    // DHT
    jpeg.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x1F, 0x00]);
    jpeg.extend_from_slice(&[0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01]);
    jpeg.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    jpeg.extend_from_slice(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
    jpeg.extend_from_slice(&[0x08, 0x09, 0x0A, 0x0B]);

    // SOS + minimal scan + EOI
    jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0C, 0x03]);
    jpeg.extend_from_slice(&[0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00]);
    jpeg.extend_from_slice(&[(sequence % 251) as u8, 0x00]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);

    Bytes::from(jpeg)
}
