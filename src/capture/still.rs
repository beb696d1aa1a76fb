//! Still image frame source
//!
//! Serves pre-recorded images in rotation. Used for kiosk demos and for
//! running the loop on machines without a camera.

use super::traits::{Frame, FrameSource, DEFAULT_JPEG_QUALITY};
use crate::utils::error::{AttendanceError, AttendanceResult};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extensions accepted when loading a directory
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Rotates through a fixed set of JPEG frames
pub struct StillImageSource {
    id: String,
    frames: Vec<Frame>,
    cursor: AtomicUsize,
}

impl StillImageSource {
    /// Build from already encoded frames
    pub fn from_frames(id: impl Into<String>, frames: Vec<Frame>) -> AttendanceResult<Self> {
        if frames.is_empty() {
            return Err(AttendanceError::Config(
                "Still image source needs at least one frame".to_string(),
            ));
        }
        Ok(Self {
            id: id.into(),
            frames,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Load a single image file or every image in a directory (sorted by name)
    pub fn open(path: &Path) -> AttendanceResult<Self> {
        let paths = if path.is_dir() {
            let mut paths: Vec<_> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_image(p))
                .collect();
            paths.sort();
            paths
        } else {
            vec![path.to_path_buf()]
        };

        let frames = paths
            .iter()
            .map(|p| load_frame(p))
            .collect::<AttendanceResult<Vec<_>>>()?;

        tracing::info!("Loaded {} still frame(s) from {:?}", frames.len(), path);
        Self::from_frames(format!("still:{}", path.display()), frames)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for StillImageSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&self) -> Option<Frame> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        self.frames.get(index).cloned()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read an image file, re-encoding anything that is not JPEG
fn load_frame(path: &Path) -> AttendanceResult<Frame> {
    let data = fs::read(path)?;
    if data.starts_with(&[0xFF, 0xD8]) {
        return Ok(Frame::jpeg(data));
    }

    let rgb = image::load_from_memory(&data)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    Frame::from_rgb(width, height, rgb.as_raw(), DEFAULT_JPEG_QUALITY)
}
