//! Capture trait definitions
//!
//! Platform-agnostic types for frame sources.

use crate::utils::error::AttendanceResult;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

/// MIME type of every frame handed to the identification service
pub const JPEG_MIME: &str = "image/jpeg";

/// Default JPEG quality used when encoding raw camera frames
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// One encoded still image captured at a single instant.
///
/// A frame lives for exactly one detect/submit cycle and is dropped when the
/// cycle ends.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap already JPEG-encoded bytes
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }

    /// Encode a raw RGB8 buffer as JPEG
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8], quality: u8) -> AttendanceResult<Self> {
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, quality).encode(
            rgb,
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(Self::jpeg(data))
    }

    /// Encoded bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime(&self) -> &'static str {
        JPEG_MIME
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Decode into an RGB8 image (used by local detectors)
    pub fn decode_rgb(&self) -> AttendanceResult<RgbImage> {
        let image = image::load_from_memory_with_format(&self.data, ImageFormat::Jpeg)?;
        Ok(image.to_rgb8())
    }
}

/// A source of frames.
///
/// `capture` is synchronous and must not block: it returns `None` when the
/// underlying device has not produced a frame yet.
pub trait FrameSource: Send + Sync {
    /// Source identifier used in logs
    fn id(&self) -> &str;

    /// Latest available frame, if any
    fn capture(&self) -> Option<Frame>;
}

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_frame_encodes_as_jpeg() {
        let rgb = vec![128u8; 8 * 8 * 3];
        let frame = Frame::from_rgb(8, 8, &rgb, DEFAULT_JPEG_QUALITY).unwrap();

        // JPEG SOI marker
        assert_eq!(&frame.bytes()[..2], &[0xFF, 0xD8]);
        assert_eq!(frame.mime(), "image/jpeg");

        let decoded = frame.decode_rgb().unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn test_garbage_frame_fails_to_decode() {
        let frame = Frame::jpeg(b"not a jpeg".to_vec());
        assert!(frame.decode_rgb().is_err());
    }
}
