use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A raw, unencoded frame captured from a [`crate::source::FrameSource`].
///
/// Owned transiently by the capture loop and moved into the encoder.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Capture time in milliseconds since the Unix epoch.
    pub captured_at_ms: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data: Arc::new(data),
            width,
            height,
            captured_at_ms: now_ms(),
        }
    }
}

/// An encoded (JPEG) frame, immutable once published to the [`crate::broker::FrameBroker`].
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub jpeg: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub captured_at_ms: u64,
}

impl EncodedFrame {
    pub fn new(jpeg: Vec<u8>, width: u32, height: u32, captured_at_ms: u64) -> Self {
        Self {
            jpeg: Arc::new(jpeg),
            width,
            height,
            captured_at_ms,
        }
    }

    /// Byte-identity comparison used by the broker's dedup rule. Two
    /// frames are the same publish iff their encoded bytes are equal.
    pub fn same_bytes(&self, other: &EncodedFrame) -> bool {
        self.jpeg == other.jpeg
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
