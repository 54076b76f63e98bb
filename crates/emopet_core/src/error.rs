//! Engine Error Types

use thiserror::Error;

/// Errors that can occur while setting up audio or loading configuration
///
/// The public engine contract (`unlock`, `play`, `stop`, `tick`) never
/// returns these; they are logged and the engine degrades instead.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No audio devices found")]
    NoDevicesFound,

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to resume audio output: {0}")]
    ResumeFailed(String),

    #[error("Audio output is closed")]
    OutputClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,

    #[error("DSP error: {0}")]
    DspError(#[from] emopet_dsp::DspError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
