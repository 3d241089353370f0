use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Largest width or height a baseline JPEG frame header can carry
const MAX_JPEG_DIMENSION: u32 = 65_535;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClickcamConfig {
    pub button: ButtonConfig,
    pub capture: CaptureConfig,
    pub camera: CameraConfig,
    pub stream: StreamConfig,
    pub system: SystemConfig,
}

/// Where the button level is read from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ButtonBackend {
    /// Terminal keys drive a simulated button (`c` click, `h` hold toggle)
    Keyboard,
    /// Sysfs GPIO value file
    Gpio,
    /// Linux input device key state
    Evdev,
}

/// Where camera frames come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// Generated JPEG frames from a bounded in-memory pool
    Synthetic,
    /// V4L2 MJPEG capture through a GStreamer pipeline
    Gstreamer,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ButtonConfig {
    /// Input backend
    #[serde(default = "default_button_backend")]
    pub backend: ButtonBackend,

    /// Input device path for the evdev backend
    #[serde(default = "default_button_device")]
    pub device: String,

    /// Key code reported by the evdev device for the button
    #[serde(default = "default_button_key_code")]
    pub key_code: u16,

    /// GPIO line number for the gpio backend
    #[serde(default = "default_gpio_pin")]
    pub gpio_pin: u32,

    /// Pressed reads as electrical HIGH (pull-down wiring)
    #[serde(default = "default_active_high")]
    pub active_high: bool,

    /// Control loop tick period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Press duration after which a press becomes a hold
    #[serde(default = "default_hold_threshold_ms")]
    pub hold_threshold_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Minimum time between two successful photo captures
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Stale frames discarded before taking a photo
    #[serde(default = "default_flush_frames")]
    pub flush_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Frame source backend
    #[serde(default = "default_camera_backend")]
    pub backend: CameraBackend,

    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second requested from the sensor
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Number of frame buffers the source can hand out at once
    #[serde(default = "default_frame_pool")]
    pub frame_pool: usize,

    /// Upper bound on how long a single acquire may wait
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StreamConfig {
    /// IP address to bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_stream_port")]
    pub port: u16,

    /// Concurrent MJPEG clients
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Upper bound on writing one frame to one client
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// First message sent to every notification listener
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Interval between periodic status log lines
    #[serde(default = "default_status_log_interval_secs")]
    pub status_log_interval_secs: u64,
}

impl ButtonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn hold_threshold(&self) -> Duration {
        Duration::from_millis(self.hold_threshold_ms)
    }
}

impl CaptureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl StreamConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl ClickcamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("button.backend", "keyboard")?
            .set_default("button.device", default_button_device())?
            .set_default("button.key_code", default_button_key_code() as u64)?
            .set_default("button.gpio_pin", default_gpio_pin() as u64)?
            .set_default("button.active_high", default_active_high())?
            .set_default("button.poll_interval_ms", default_poll_interval_ms())?
            .set_default("button.hold_threshold_ms", default_hold_threshold_ms())?
            .set_default("capture.cooldown_ms", default_cooldown_ms())?
            .set_default("capture.flush_frames", default_flush_frames() as u64)?
            .set_default("camera.backend", "synthetic")?
            .set_default("camera.index", default_camera_index() as u64)?
            .set_default(
                "camera.resolution",
                vec![
                    default_camera_resolution().0 as u64,
                    default_camera_resolution().1 as u64,
                ],
            )?
            .set_default("camera.fps", default_camera_fps() as u64)?
            .set_default("camera.frame_pool", default_frame_pool() as u64)?
            .set_default("camera.acquire_timeout_ms", default_acquire_timeout_ms())?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.port", default_stream_port() as u64)?
            .set_default("stream.max_clients", default_max_clients() as u64)?
            .set_default("stream.write_timeout_ms", default_write_timeout_ms())?
            .set_default("stream.greeting", default_greeting())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as u64,
            )?
            .set_default(
                "system.status_log_interval_secs",
                default_status_log_interval_secs(),
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // CLICKCAM_BUTTON__HOLD_THRESHOLD_MS=800 style overrides
            .add_source(
                Environment::with_prefix("CLICKCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClickcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.button.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Button poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.button.hold_threshold_ms <= self.button.poll_interval_ms {
            return Err(ConfigError::Message(format!(
                "Button hold_threshold_ms ({}) must be greater than poll_interval_ms ({})",
                self.button.hold_threshold_ms, self.button.poll_interval_ms
            )));
        }

        if self.button.backend == ButtonBackend::Evdev && !cfg!(feature = "button") {
            return Err(ConfigError::Message(
                "Button backend 'evdev' requires the 'button' feature".to_string(),
            ));
        }

        if self.capture.flush_frames > 8 {
            return Err(ConfigError::Message(
                "Capture flush_frames must be at most 8".to_string(),
            ));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.resolution.0 > MAX_JPEG_DIMENSION
            || self.camera.resolution.1 > MAX_JPEG_DIMENSION
        {
            return Err(ConfigError::Message(format!(
                "Camera resolution {}x{} exceeds the JPEG limit of {} pixels per side",
                self.camera.resolution.0, self.camera.resolution.1, MAX_JPEG_DIMENSION
            )));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if self.camera.frame_pool == 0 {
            return Err(ConfigError::Message(
                "Camera frame_pool must be greater than 0".to_string(),
            ));
        }

        if self.camera.backend == CameraBackend::Gstreamer && !cfg!(feature = "camera") {
            return Err(ConfigError::Message(
                "Camera backend 'gstreamer' requires the 'camera' feature".to_string(),
            ));
        }

        if self.stream.max_clients == 0 {
            return Err(ConfigError::Message(
                "Stream max_clients must be greater than 0".to_string(),
            ));
        }

        if self.stream.write_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Stream write_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClickcamConfig {
    fn default() -> Self {
        Self {
            button: ButtonConfig {
                backend: default_button_backend(),
                device: default_button_device(),
                key_code: default_button_key_code(),
                gpio_pin: default_gpio_pin(),
                active_high: default_active_high(),
                poll_interval_ms: default_poll_interval_ms(),
                hold_threshold_ms: default_hold_threshold_ms(),
            },
            capture: CaptureConfig {
                cooldown_ms: default_cooldown_ms(),
                flush_frames: default_flush_frames(),
            },
            camera: CameraConfig {
                backend: default_camera_backend(),
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                frame_pool: default_frame_pool(),
                acquire_timeout_ms: default_acquire_timeout_ms(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                port: default_stream_port(),
                max_clients: default_max_clients(),
                write_timeout_ms: default_write_timeout_ms(),
                greeting: default_greeting(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
                status_log_interval_secs: default_status_log_interval_secs(),
            },
        }
    }
}

// Default value functions
fn default_button_backend() -> ButtonBackend {
    ButtonBackend::Keyboard
}
fn default_button_device() -> String {
    "/dev/input/event0".to_string()
}
fn default_button_key_code() -> u16 {
    0x100 // BTN_0
}
fn default_gpio_pin() -> u32 {
    5
}
fn default_active_high() -> bool {
    true
}
fn default_poll_interval_ms() -> u64 {
    20
}
fn default_hold_threshold_ms() -> u64 {
    500
}

fn default_cooldown_ms() -> u64 {
    1000
}
fn default_flush_frames() -> u32 {
    2
}

fn default_camera_backend() -> CameraBackend {
    CameraBackend::Synthetic
}
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    15
}
fn default_frame_pool() -> usize {
    2
}
fn default_acquire_timeout_ms() -> u64 {
    100
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_stream_port() -> u16 {
    8080
}
fn default_max_clients() -> usize {
    2
}
fn default_write_timeout_ms() -> u64 {
    1000
}
fn default_greeting() -> String {
    "Web Client Connected".to_string()
}

fn default_event_bus_capacity() -> usize {
    64
}
fn default_status_log_interval_secs() -> u64 {
    60
}
