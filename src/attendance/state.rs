//! Attendance state management
//!
//! Defines the polling state machine and the values that flow through it.

use serde::{Deserialize, Serialize};

/// Result of asking the detector about a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "count")]
pub enum DetectionOutcome {
    NoFace,
    /// At least one face; the count is always >= 1
    FacesPresent(usize),
}

impl DetectionOutcome {
    /// Build from a raw detection count
    pub fn from_count(count: usize) -> Self {
        if count == 0 {
            Self::NoFace
        } else {
            Self::FacesPresent(count)
        }
    }

    pub fn has_face(&self) -> bool {
        matches!(self, Self::FacesPresent(_))
    }
}

/// Outcome of one submission to the identification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SubmissionResult {
    /// The service matched the frame against a known person
    #[serde(rename_all = "camelCase")]
    Identified { name: String, roll_number: String },
    /// The service answered but found no usable match
    NoMatch,
    /// The request never produced a usable answer
    TransportFailure,
}

impl SubmissionResult {
    pub fn is_identified(&self) -> bool {
        matches!(self, Self::Identified { .. })
    }
}

/// Current state of the polling loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "result")]
pub enum OrchestratorState {
    /// Waiting for the next tick
    Idle,
    /// A frame is with the detector
    AwaitingDetection,
    /// A frame is with the identification service
    Submitting,
    /// Showing a result until the dwell timer fires
    DisplayingResult(SubmissionResult),
    /// `stop()` was called; nothing mutates the state until the next `start()`
    Stopped,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self::Idle
    }
}

impl OrchestratorState {
    /// A cycle is in flight
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::AwaitingDetection | Self::Submitting | Self::DisplayingResult(_)
        )
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingDetection => "awaiting_detection",
            Self::Submitting => "submitting",
            Self::DisplayingResult(_) => "displaying_result",
            Self::Stopped => "stopped",
        }
    }
}

/// Counters for one orchestrator instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    /// Timer ticks delivered
    pub ticks: u64,
    /// Ticks dropped because a cycle was in flight
    pub skipped_ticks: u64,
    /// Ticks where the capture source had no frame
    pub captures_missed: u64,
    /// Detector invocations
    pub detections: u64,
    /// Detector errors and timeouts
    pub detection_failures: u64,
    /// Identification requests sent
    pub submissions: u64,
    pub identified: u64,
    pub not_found: u64,
    pub transport_failures: u64,
}
