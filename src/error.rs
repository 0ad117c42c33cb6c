#![allow(dead_code)]

use thiserror::Error;

/// Top-level error type for the streamer.
#[derive(Error, Debug)]
pub enum StreamerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("frame source error: {0}")]
    Source(#[from] SourceError),

    #[error("encoder error: {0}")]
    Encode(#[from] EncodeError),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening or reading from a [`crate::source::FrameSource`].
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("camera device {device} is unavailable: {details}")]
    DeviceUnavailable { device: String, details: String },

    #[error("transient read failure: {details}")]
    TransientReadFailure { details: String },
}

/// Errors raised by [`crate::encoder::Encoder`].
#[derive(Error, Debug, Clone)]
pub enum EncodeError {
    #[error("failed to encode frame: {details}")]
    EncodeFailed { details: String },
}

/// Errors raised by the HTTP streaming layer.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        source: std::io::Error,
    },

    #[error("peer closed the connection")]
    PeerClosed,
}

impl StreamerError {
    /// Process exit code this error should produce, per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            StreamerError::InvalidArgument(_) => 1,
            StreamerError::Source(SourceError::DeviceUnavailable { .. }) => 1,
            StreamerError::Stream(StreamError::BindFailed { .. }) => 2,
            _ => 1,
        }
    }
}

/// Convenience alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, StreamerError>;
