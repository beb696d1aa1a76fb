//! Webcam frame source using nokhwa
//!
//! A background thread pulls frames from the camera and keeps only the most
//! recent one. `capture` hands out that frame JPEG-encoded, so the polling
//! loop never waits on the device.

use super::traits::{CameraInfo, Frame, FrameSource, Resolution};
use crate::utils::error::{AttendanceError, AttendanceResult};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution as NokhwaResolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Get list of available cameras
pub fn get_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };

                CameraInfo {
                    id,
                    name: info.human_name(),
                    supported_resolutions: vec![
                        Resolution {
                            width: 1280,
                            height: 720,
                        },
                        Resolution {
                            width: 640,
                            height: 480,
                        },
                    ],
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Raw RGB frame as last delivered by the camera thread
struct RawFrame {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

/// Frame source backed by a live camera
pub struct WebcamSource {
    id: String,
    latest: Arc<Mutex<Option<RawFrame>>>,
    running: Arc<AtomicBool>,
    jpeg_quality: u8,
    capture_thread: Option<std::thread::JoinHandle<()>>,
}

impl WebcamSource {
    /// Open a camera and start the capture thread.
    ///
    /// `device_id` is either a numeric index or a backend-specific string;
    /// `None` selects the first camera.
    pub fn open(
        device_id: Option<String>,
        width: u32,
        height: u32,
        jpeg_quality: u8,
    ) -> AttendanceResult<Self> {
        if get_cameras().is_empty() {
            return Err(AttendanceError::Device("No cameras found".to_string()));
        }

        let camera_index = camera_index(device_id.as_deref());
        let id = format!("webcam:{}", device_id.as_deref().unwrap_or("0"));
        let latest: Arc<Mutex<Option<RawFrame>>> = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));

        let thread_latest = latest.clone();
        let thread_running = running.clone();
        let thread_index = camera_index.clone();

        let handle = std::thread::spawn(move || {
            let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(NokhwaResolution::new(width, height), FrameFormat::MJPEG, 30),
            ));

            let mut camera = match Camera::new(thread_index.clone(), format) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to open camera {:?}: {:?}", thread_index, e);
                    return;
                }
            };

            if let Err(e) = camera.open_stream() {
                tracing::error!("Failed to open camera stream: {:?}", e);
                return;
            }

            let resolution = camera.resolution();
            tracing::info!(
                "Webcam opened: {}x{} (requested {}x{})",
                resolution.width(),
                resolution.height(),
                width,
                height
            );

            while thread_running.load(Ordering::SeqCst) {
                // Blocks until the camera delivers the next frame
                match camera.frame().and_then(|buffer| buffer.decode_image::<RgbFormat>()) {
                    Ok(image) => {
                        let (w, h) = (image.width(), image.height());
                        *thread_latest.lock() = Some(RawFrame {
                            width: w,
                            height: h,
                            rgb: image.into_raw(),
                        });
                    }
                    Err(e) => {
                        tracing::debug!("Failed to capture frame: {:?}", e);
                    }
                }
            }

            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {:?}", e);
            }
            tracing::info!("Webcam capture thread stopped");
        });

        Ok(Self {
            id,
            latest,
            running,
            jpeg_quality,
            capture_thread: Some(handle),
        })
    }
}

impl FrameSource for WebcamSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&self) -> Option<Frame> {
        let guard = self.latest.lock();
        let raw = guard.as_ref()?;
        match Frame::from_rgb(raw.width, raw.height, &raw.rgb, self.jpeg_quality) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("Failed to encode webcam frame: {}", e);
                None
            }
        }
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            let _ = handle.join();
        }
    }
}

fn camera_index(device_id: Option<&str>) -> CameraIndex {
    match device_id {
        Some(id) => match id.parse::<u32>() {
            Ok(idx) => CameraIndex::Index(idx),
            Err(_) => CameraIndex::String(id.to_string()),
        },
        None => CameraIndex::Index(0),
    }
}
