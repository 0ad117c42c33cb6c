use super::{DeviceInfo, FrameSource};
use crate::error::SourceError;
use crate::frame::Frame;
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::FourCC;

/// V4L2 camera backend, Linux-only. Negotiates MJPEG capture at the
/// requested resolution; the driver may adjust width/height, which is
/// reported back to the caller via [`FrameSource::resolution`] rather
/// than silently re-requested.
pub struct V4l2FrameSource {
    stream: Stream<'static>,
    width: u32,
    height: u32,
}

impl V4l2FrameSource {
    pub fn open(device_path: &str, requested: (u32, u32)) -> Result<Self, SourceError> {
        // The device must outlive the mmap stream borrowed from it, and
        // both live for the supervisor's entire run, so we leak it into
        // a 'static reference rather than threading a lifetime param
        // through `FrameSource`.
        let device: &'static v4l::Device = Box::leak(Box::new(
            v4l::Device::with_path(device_path).map_err(|e| SourceError::DeviceUnavailable {
                device: device_path.to_string(),
                details: e.to_string(),
            })?,
        ));

        let mut format = device
            .format()
            .map_err(|e| SourceError::DeviceUnavailable {
                device: device_path.to_string(),
                details: format!("failed to read current format: {}", e),
            })?;
        format.width = requested.0;
        format.height = requested.1;
        format.fourcc = FourCC::new(b"MJPG");

        let negotiated = device
            .set_format(&format)
            .map_err(|e| SourceError::DeviceUnavailable {
                device: device_path.to_string(),
                details: format!("failed to set format: {}", e),
            })?;

        if (negotiated.width, negotiated.height) != requested {
            warn!(
                "camera resolution adjusted by driver: requested {}x{}, got {}x{}",
                requested.0, requested.1, negotiated.width, negotiated.height
            );
        }

        let stream = Stream::with_buffers(device, Type::VideoCapture, 4).map_err(|e| {
            SourceError::DeviceUnavailable {
                device: device_path.to_string(),
                details: format!("failed to start capture stream: {}", e),
            }
        })?;

        Ok(Self {
            stream,
            width: negotiated.width,
            height: negotiated.height,
        })
    }

    /// Enumerate `/dev/video0`..`/dev/video9` that exist, opening each
    /// briefly to read its driver-reported card name (the same name a
    /// `VIDIOC_QUERYCAP` ioctl would return). Falls back to the device
    /// path itself if the query fails, so a `--device-name` match
    /// against a card name like `"Integrated Camera"` has something
    /// real to compare against.
    pub fn enumerate() -> Vec<DeviceInfo> {
        (0..10)
            .filter_map(|i| {
                let path = format!("/dev/video{}", i);
                if !Path::new(&path).exists() {
                    return None;
                }

                let name = v4l::Device::with_path(&path)
                    .and_then(|device| device.query_caps())
                    .map(|caps| caps.card)
                    .unwrap_or_else(|e| {
                        warn!("failed to query capabilities for {}: {}", path, e);
                        path.clone()
                    });

                Some(DeviceInfo { index: i, name })
            })
            .collect()
    }
}

#[async_trait]
impl FrameSource for V4l2FrameSource {
    async fn read_frame(&mut self) -> Result<Frame, SourceError> {
        let (width, height) = (self.width, self.height);
        let (buffer, _meta) =
            self.stream
                .next()
                .map_err(|e| SourceError::TransientReadFailure {
                    details: e.to_string(),
                })?;

        Ok(Frame::new(buffer.to_vec(), width, height))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
