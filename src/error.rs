//! Error handling for the camera stream engine

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (rejected before any network activity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Control call issued while the relay subprocess is not active
    #[error("Relay not running")]
    RelayNotRunning,

    /// Relay did not answer its liveness endpoint within the polling budget
    #[error("Relay startup timeout after {attempts} attempts")]
    StartupTimeout { attempts: u32 },

    /// Relay rejected a control-plane request
    #[error("Relay error: {0}")]
    Relay(String),

    /// Frame source (capture) failure
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML error (relay bootstrap config)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for callers that surface errors upstream
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::RelayNotRunning => "RELAY_NOT_RUNNING",
            Error::StartupTimeout { .. } => "RELAY_STARTUP_TIMEOUT",
            Error::Relay(_) => "RELAY_ERROR",
            Error::FrameSource(_) => "FRAME_SOURCE_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Http(_) => "HTTP_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
