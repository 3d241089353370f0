use std::fmt;

/// Lifecycle of one orchestrated component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ComponentState {
    /// Whether shutdown still has to stop this component
    pub fn needs_stop(self) -> bool {
        matches!(self, ComponentState::Starting | ComponentState::Running)
    }
}

/// Why `run()` returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Signal(&'static str),
    /// Quit key or another `ShutdownRequested` publisher
    UserRequest(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::UserRequest(reason) => write!(f, "requested: {}", reason),
        }
    }
}
