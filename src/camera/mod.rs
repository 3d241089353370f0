mod builder;
mod pool;
mod synthetic;
#[cfg(all(feature = "camera", target_os = "linux"))]
mod v4l2;

pub use builder::FrameSourceBuilder;
pub use pool::FramePool;
pub use synthetic::{synthetic_jpeg, SyntheticFrameSource};
#[cfg(all(feature = "camera", target_os = "linux"))]
pub use v4l2::{build_pipeline_string, GstFrameSource};
