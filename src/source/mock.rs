use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;
use async_trait::async_trait;
use image::{ImageBuffer, Rgb};
use std::time::Duration;

/// Synthetic frame generator used in tests and on platforms without a
/// V4L2 backend. Produces a solid-color JPEG frame at a fixed interval,
/// cycling through a small palette so consecutive frames are
/// distinguishable (and thus not deduped) unless a test asks otherwise.
pub struct MockFrameSource {
    width: u32,
    height: u32,
    interval: Duration,
    frame_count: u64,
    fail_after: Option<u64>,
}

impl MockFrameSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        let interval = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        Self {
            width,
            height,
            interval,
            frame_count: 0,
            fail_after: None,
        }
    }

    /// Return a [`SourceError::TransientReadFailure`] starting at the
    /// given frame count, for exercising the capture loop's retry path.
    pub fn failing_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }

    fn palette_color(index: u64) -> Rgb<u8> {
        const PALETTE: [[u8; 3]; 4] = [[200, 0, 0], [0, 200, 0], [0, 0, 200], [200, 200, 0]];
        Rgb(PALETTE[(index % 4) as usize])
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn read_frame(&mut self) -> Result<Frame, SourceError> {
        tokio::time::sleep(self.interval).await;

        if let Some(fail_after) = self.fail_after {
            if self.frame_count >= fail_after {
                return Err(SourceError::TransientReadFailure {
                    details: "mock source injected failure".into(),
                });
            }
        }

        let color = Self::palette_color(self.frame_count);
        let image: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(self.width, self.height, color);

        let mut jpeg = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 90);
        encoder
            .encode_image(&image)
            .map_err(|e| SourceError::TransientReadFailure {
                details: e.to_string(),
            })?;

        self.frame_count += 1;
        Ok(Frame::new(jpeg, self.width, self.height))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_frames_at_requested_resolution() {
        let mut source = MockFrameSource::new(8, 8, 1000);
        let frame = source.read_frame().await.unwrap();
        assert_eq!(frame.width, 8);
        assert_eq!(frame.height, 8);
        assert!(frame.data.starts_with(&[0xFF, 0xD8]));
    }

    #[tokio::test]
    async fn fails_transiently_after_configured_count() {
        let mut source = MockFrameSource::new(4, 4, 1000).failing_after(1);
        source.read_frame().await.unwrap();
        let err = source.read_frame().await.unwrap_err();
        assert!(matches!(err, SourceError::TransientReadFailure { .. }));
    }
}
