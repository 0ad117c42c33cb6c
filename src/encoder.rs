use crate::error::EncodeError;
use crate::frame::{EncodedFrame, Frame};
use image::imageops::FilterType;
use image::{ImageBuffer, Rgb};
use std::io::Cursor;
use tracing::warn;

/// Resizes (when needed) and JPEG-encodes raw frames at a fixed quality.
///
/// Quality is clamped to `[1, 100]` at construction time.
pub struct Encoder {
    quality: u8,
    target_size: Option<(u32, u32)>,
}

impl Encoder {
    pub fn new(quality: u8, target_size: Option<(u32, u32)>) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            target_size,
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a raw frame. If a target size is configured and differs
    /// from the source, the frame is resized with a bilinear filter
    /// first; otherwise it passes through unchanged.
    pub fn encode(&self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        let image = decode_rgb(frame)?;

        let (target_w, target_h) = self.target_size.unwrap_or((frame.width, frame.height));
        let resized = if (target_w, target_h) != (frame.width, frame.height) {
            image::imageops::resize(&image, target_w, target_h, FilterType::Triangle)
        } else {
            image
        };

        let mut jpeg_bytes = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, self.quality);
        encoder
            .encode_image(&resized)
            .map_err(|e| EncodeError::EncodeFailed {
                details: e.to_string(),
            })?;

        Ok(EncodedFrame::new(
            jpeg_bytes,
            resized.width(),
            resized.height(),
            frame.captured_at_ms,
        ))
    }

    /// A deterministic 1x1 black JPEG, used by the snapshot endpoint
    /// before any frame has ever been published.
    pub fn placeholder() -> Vec<u8> {
        let image: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(1, 1, Rgb([0, 0, 0]));
        let mut bytes = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 80);
        encoder
            .encode_image(&image)
            .expect("encoding a 1x1 placeholder cannot fail");
        bytes
    }
}

/// Decode whatever the source handed us into an RGB8 buffer we can
/// resize and re-encode. Frames from [`crate::source::MockFrameSource`]
/// and the V4L2 backend are both already-valid JPEG bytes (MJPEG
/// capture), so this is a straight decode; non-JPEG raw formats are not
/// supported; there is no hardware transcoding path.
fn decode_rgb(frame: &Frame) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>, EncodeError> {
    image::load(Cursor::new(frame.data.as_slice()), image::ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| {
            warn!("failed to decode source frame: {}", e);
            EncodeError::EncodeFailed {
                details: e.to_string(),
            }
        })
}
