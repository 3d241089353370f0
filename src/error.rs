use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClickcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Button error: {0}")]
    Button(#[from] ButtonError),

    #[error("Frame source error: {0}")]
    FrameSource(#[from] FrameSourceError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ClickcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by the physical (or simulated) button layer
#[derive(Error, Debug)]
pub enum ButtonError {
    #[error("Failed to open button device {device}: {details}")]
    DeviceOpen { device: String, details: String },

    #[error("Failed to read button level from {device}: {details}")]
    Read { device: String, details: String },

    #[error("Button backend not available: {0}")]
    NotAvailable(String),
}

/// Errors raised by a frame source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameSourceError {
    #[error("No frame available: {details}")]
    Unavailable { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Frame source is not running")]
    NotRunning,
}

impl FrameSourceError {
    pub fn unavailable<S: Into<String>>(details: S) -> Self {
        Self::Unavailable {
            details: details.into(),
        }
    }

    /// Transient errors clear up on their own; the next tick simply tries again
    pub fn is_transient(&self) -> bool {
        matches!(self, FrameSourceError::Unavailable { .. })
    }
}

/// Errors raised by the streaming endpoints and stream sessions
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind stream server to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream server startup failed: {details}")]
    StartupFailed { details: String },

    #[error("Stream client disconnected")]
    ClientDisconnected,

    #[error("Stream write timed out after {timeout_ms} ms")]
    WriteTimeout { timeout_ms: u64 },

    #[error("Too many stream clients (max {max})")]
    TooManyClients { max: usize },

    #[error("Control loop is not running")]
    ControllerUnavailable,
}

impl StreamError {
    /// Write failures end the session they occurred on
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            StreamError::ClientDisconnected | StreamError::WriteTimeout { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, ClickcamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_source_error_transience() {
        assert!(FrameSourceError::unavailable("pool empty").is_transient());
        assert!(!FrameSourceError::NotRunning.is_transient());
        assert!(!FrameSourceError::Configuration {
            details: "bad pipeline".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_stream_write_failures() {
        assert!(StreamError::ClientDisconnected.is_write_failure());
        assert!(StreamError::WriteTimeout { timeout_ms: 1000 }.is_write_failure());
        assert!(!StreamError::TooManyClients { max: 2 }.is_write_failure());
    }

    #[test]
    fn test_error_conversion_and_display() {
        let err: ClickcamError = FrameSourceError::unavailable("no sample").into();
        assert_eq!(
            err.to_string(),
            "Frame source error: No frame available: no sample"
        );

        let err = ClickcamError::component("button", "device vanished");
        assert_eq!(
            err.to_string(),
            "Component error in button: device vanished"
        );
    }
}
