use super::synthetic::SyntheticFrameSource;
use crate::config::{CameraBackend, CameraConfig};
use crate::error::{ClickcamError, Result};
use crate::frame::FrameSource;
use std::sync::Arc;
use tracing::info;

/// Builder for the configured frame source
pub struct FrameSourceBuilder {
    config: Option<CameraConfig>,
}

impl FrameSourceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Arc<dyn FrameSource>> {
        let config = self
            .config
            .ok_or_else(|| ClickcamError::system("Camera configuration must be specified"))?;

        info!("Building {:?} frame source", config.backend);

        match config.backend {
            CameraBackend::Synthetic => Ok(Arc::new(SyntheticFrameSource::new(
                config.resolution,
                config.frame_pool,
            ))),
            CameraBackend::Gstreamer => build_gstreamer(config),
        }
    }
}

impl Default for FrameSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "camera", target_os = "linux"))]
fn build_gstreamer(config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
    Ok(Arc::new(super::v4l2::GstFrameSource::new(config)?))
}

#[cfg(not(all(feature = "camera", target_os = "linux")))]
fn build_gstreamer(_config: CameraConfig) -> Result<Arc<dyn FrameSource>> {
    Err(ClickcamError::component(
        "camera",
        "GStreamer capture requires the 'camera' feature on Linux",
    ))
}
