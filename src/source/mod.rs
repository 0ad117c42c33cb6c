pub mod mock;

#[cfg(target_os = "linux")]
pub mod v4l2;

use crate::error::SourceError;
use crate::frame::Frame;
use async_trait::async_trait;

/// A camera or synthetic backend that the capture loop pulls frames from.
///
/// Implementations own whatever device handle they need and are polled
/// exclusively by the supervisor's capture loop — never shared across
/// tasks. Negotiated width/height may differ from what was requested;
/// callers read them back off the returned [`Frame`].
#[async_trait]
pub trait FrameSource: Send {
    /// Block until the next frame is available, or return an error.
    ///
    /// A [`SourceError::TransientReadFailure`] is retryable by the
    /// caller; [`SourceError::DeviceUnavailable`] is not.
    async fn read_frame(&mut self) -> Result<Frame, SourceError>;

    /// The negotiated capture resolution, once known.
    fn resolution(&self) -> (u32, u32);
}

/// Describes a capture device discovered during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: u32,
    pub name: String,
}
