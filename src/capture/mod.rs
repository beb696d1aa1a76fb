//! Frame capture sources
//!
//! This module provides the camera and still-image sources the orchestrator
//! samples from.

pub mod still;
pub mod traits;

#[cfg(feature = "webcam")]
pub mod webcam;

pub use still::StillImageSource;
pub use traits::{CameraInfo, Frame, FrameSource, Resolution};

#[cfg(feature = "webcam")]
pub use webcam::WebcamSource;

/// List cameras visible to the native backend
pub fn list_cameras() -> Vec<CameraInfo> {
    #[cfg(feature = "webcam")]
    {
        webcam::get_cameras()
    }

    #[cfg(not(feature = "webcam"))]
    {
        tracing::warn!("Built without the `webcam` feature; no cameras available");
        Vec::new()
    }
}
