//! Error kinds raised by the compositing pipeline

use thiserror::Error;

/// A frame source failed to deliver a frame.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{name}: no frame within {timeout_ms} ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("{name}: device fault: {reason}")]
    Device { name: String, reason: String },

    #[error("{name}: cannot decode {format} frame: {reason}")]
    Decode {
        name: String,
        format: String,
        reason: String,
    },

    #[error("{name}: source unavailable: {reason}")]
    Unavailable { name: String, reason: String },
}

impl CaptureError {
    pub fn device(name: &str, reason: impl ToString) -> Self {
        Self::Device {
            name: name.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub fn unavailable(name: &str, reason: impl ToString) -> Self {
        Self::Unavailable {
            name: name.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Non-positive target size handed to the aligner or to capture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid target size {width}x{height}")]
pub struct DimensionError {
    pub width: u32,
    pub height: u32,
}

/// Two frames that must share a size do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("frame size mismatch: {left:?} vs {right:?}")]
pub struct DimensionMismatchError {
    pub left: (u32, u32),
    pub right: (u32, u32),
}

/// Out-of-range control write. Clamped and logged, never returned to the writer.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} = {value} outside [{min}, {max}]")]
pub struct ControlRangeError {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display backend: {0}")]
    Backend(String),

    #[error("frame buffer rejected: {0}")]
    Upload(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("camera: {0}")]
    Dimension(#[from] DimensionError),

    #[error("{0}")]
    Invalid(String),
}

/// Terminal failure of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatchError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error("pipeline already stopped")]
    Stopped,
}
