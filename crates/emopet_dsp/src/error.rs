//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("Buffer size mismatch: expected a multiple of {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
}
