//! Error types and handling
//!
//! Common error types used across the kiosk. None of these escape the
//! orchestrator: it absorbs every failure and returns to `Idle`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("No frame available from capture source")]
    CaptureUnavailable,

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Device error: {0}")]
    Device(String),
}

impl AttendanceError {
    /// Stable code used in events and structured logs
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::CaptureUnavailable => "CAPTURE_UNAVAILABLE",
            AttendanceError::Detection(_) => "DETECTION_FAILURE",
            AttendanceError::Transport(_) | AttendanceError::Http(_) => "TRANSPORT_FAILURE",
            AttendanceError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            AttendanceError::Timeout { .. } => "TIMEOUT",
            AttendanceError::Io(_) => "IO_ERROR",
            AttendanceError::Serialization(_) => "SERIALIZATION_ERROR",
            AttendanceError::Image(_) => "IMAGE_ERROR",
            AttendanceError::Config(_) => "CONFIG_ERROR",
            AttendanceError::Device(_) => "DEVICE_ERROR",
        }
    }
}

impl From<image::ImageError> for AttendanceError {
    fn from(error: image::ImageError) -> Self {
        AttendanceError::Image(error.to_string())
    }
}

/// Error report handed to observers of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&AttendanceError> for ErrorReport {
    fn from(error: &AttendanceError) -> Self {
        ErrorReport {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AttendanceError
pub type AttendanceResult<T> = Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AttendanceError::CaptureUnavailable.code(), "CAPTURE_UNAVAILABLE");
        assert_eq!(
            AttendanceError::Detection("model crashed".to_string()).code(),
            "DETECTION_FAILURE"
        );
        assert_eq!(
            AttendanceError::Transport("connection refused".to_string()).code(),
            "TRANSPORT_FAILURE"
        );
    }

    #[test]
    fn test_error_report_carries_message() {
        let error = AttendanceError::Timeout {
            operation: "detection",
            after: Duration::from_millis(250),
        };
        let report = ErrorReport::from(&error);

        assert_eq!(report.code, "TIMEOUT");
        assert_eq!(report.message, "detection timed out after 250ms");
    }
}
