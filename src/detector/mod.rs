//! Face-presence detection
//!
//! The orchestrator only needs to know whether a usable face is in frame.
//! Detectors may report boxes, but only the count survives into
//! [`DetectionOutcome`].

mod assume_face;

#[cfg(feature = "onnx")]
pub mod blazeface;

pub use assume_face::AssumeFaceDetector;

#[cfg(feature = "onnx")]
pub use blazeface::BlazefaceDetector;

use crate::attendance::state::DetectionOutcome;
use crate::capture::Frame;
use crate::utils::error::AttendanceResult;
use async_trait::async_trait;

/// Asynchronous face-presence classifier
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Detector name used in logs
    fn name(&self) -> &str;

    /// Load models or otherwise prepare. Sampling does not start until this
    /// has returned `Ok`.
    async fn warm_up(&self) -> AttendanceResult<()> {
        Ok(())
    }

    /// Classify one frame
    async fn detect(&self, frame: &Frame) -> AttendanceResult<DetectionOutcome>;
}
