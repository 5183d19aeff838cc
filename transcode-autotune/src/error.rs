use thiserror::Error;

use crate::types::FrameRate;

/// Reason a trial encoder could not be brought up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("Unsupported output size {width}x{height}")]
    UnsupportedSize { width: u32, height: u32 },

    #[error("Invalid bitrate: {0} kbps")]
    InvalidBitrate(u32),

    #[error("Encoder initialization failed: {message}")]
    Init { message: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Benchmark not ready: {0}")]
    NotReady(String),

    #[error("No benchmark is running")]
    NotRunning,

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("Cannot switch output frame rate to {requested}: {message}")]
    FrameRate { requested: FrameRate, message: String },

    #[error("CPU usage sampling unavailable: {0}")]
    Sampler(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Trial result index {index} out of range ({len} results)")]
    NoSuchResult { index: usize, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
