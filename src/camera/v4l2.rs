use super::pool::FramePool;
use crate::config::CameraConfig;
use crate::error::FrameSourceError;
use crate::frame::{Frame, FrameAccounting, FrameSource};
use async_trait::async_trait;
use bytes::Bytes;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use parking_lot::Mutex;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// V4L2 MJPEG camera behind a GStreamer pipeline.
///
/// The appsink keeps at most `frame_pool` samples and drops the oldest, so a
/// burst of acquires after a quiet period first drains stale frames; that is
/// what the capture flush relies on.
pub struct GstFrameSource {
    config: CameraConfig,
    pipeline: Pipeline,
    appsink: AppSink,
    pool: FramePool,
    running: Mutex<bool>,
}

impl GstFrameSource {
    /// Create the pipeline; nothing is captured until `start`
    pub fn new(config: CameraConfig) -> Result<Self, FrameSourceError> {
        info!(
            "Initializing GStreamer frame source for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        gstreamer::init().map_err(|e| FrameSourceError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = build_pipeline_string(&config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| FrameSourceError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| FrameSourceError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| FrameSourceError::Configuration {
                details: "Pipeline has no element named 'sink'".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| FrameSourceError::Configuration {
                details: "Element 'sink' is not an appsink".to_string(),
            })?;

        let pool = FramePool::new(config.frame_pool);

        Ok(Self {
            config,
            pipeline,
            appsink,
            pool,
            running: Mutex::new(false),
        })
    }

    fn sample_to_frame(
        sample: &gstreamer::Sample,
        id: u64,
        fallback: (u32, u32),
    ) -> Result<Frame, FrameSourceError> {
        let buffer = sample
            .buffer()
            .ok_or_else(|| FrameSourceError::unavailable("no buffer in sample"))?;

        let map = buffer
            .map_readable()
            .map_err(|e| FrameSourceError::unavailable(format!("failed to map buffer: {}", e)))?;

        // image/jpeg caps carry width/height as plain structure fields
        let (width, height) = sample
            .caps()
            .and_then(|caps| caps.structure(0))
            .and_then(|s| {
                let width = s.get::<i32>("width").ok()?;
                let height = s.get::<i32>("height").ok()?;
                Some((width as u32, height as u32))
            })
            .unwrap_or(fallback);

        Ok(Frame::new(
            id,
            SystemTime::now(),
            Bytes::copy_from_slice(map.as_slice()),
            width,
            height,
        ))
    }
}

#[async_trait]
impl FrameSource for GstFrameSource {
    fn name(&self) -> &str {
        "gstreamer"
    }

    async fn start(&self) -> Result<(), FrameSourceError> {
        let mut running = self.running.lock();
        if *running {
            warn!("GStreamer frame source is already running");
            return Ok(());
        }

        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| FrameSourceError::Configuration {
                details: format!("Failed to start GStreamer pipeline: {}", e),
            })?;

        *running = true;
        info!("GStreamer pipeline started successfully");
        Ok(())
    }

    async fn stop(&self) -> Result<(), FrameSourceError> {
        let mut running = self.running.lock();
        if !*running {
            debug!("GStreamer frame source is not running");
            return Ok(());
        }

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| FrameSourceError::Configuration {
                details: format!("Failed to stop GStreamer pipeline: {}", e),
            })?;

        *running = false;
        info!("GStreamer pipeline stopped");
        Ok(())
    }

    async fn acquire(&self) -> Result<Frame, FrameSourceError> {
        if !*self.running.lock() {
            return Err(FrameSourceError::NotRunning);
        }

        if !self.pool.has_capacity() {
            return Err(FrameSourceError::unavailable(format!(
                "all {} frame buffers in use",
                self.pool.capacity()
            )));
        }

        let appsink = self.appsink.clone();
        let timeout_ms = self.config.acquire_timeout_ms;

        let sample = tokio::task::spawn_blocking(move || {
            appsink.try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout_ms))
        })
        .await
        .map_err(|e| FrameSourceError::unavailable(format!("sample pull task failed: {}", e)))?
        .ok_or_else(|| {
            FrameSourceError::unavailable(format!("no sample within {} ms", timeout_ms))
        })?;

        let id = self.pool.checkout()?;
        match Self::sample_to_frame(&sample, id, self.config.resolution) {
            Ok(frame) => {
                trace!(
                    "Captured MJPEG frame {} ({}x{}, {} bytes)",
                    frame.id,
                    frame.width,
                    frame.height,
                    frame.len()
                );
                Ok(frame)
            }
            Err(e) => {
                self.pool.checkin(id);
                Err(e)
            }
        }
    }

    fn release(&self, frame: Frame) {
        self.pool.checkin(frame.id);
    }

    fn accounting(&self) -> FrameAccounting {
        self.pool.accounting()
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}

/// Build GStreamer pipeline string for MJPEG capture
pub fn build_pipeline_string(config: &CameraConfig) -> String {
    let (width, height) = config.resolution;

    format!(
        "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
         image/jpeg,width={},height={},framerate={}/1 ! \
         appsink name=sink sync=false max-buffers={} drop=true emit-signals=false",
        config.index, width, height, config.fps, config.frame_pool
    )
}
