//! Attendance polling module
//!
//! The polling/debounce/submission state machine:
//! - `OrchestratorState` and the values that flow through it
//! - `AttendanceOrchestrator` driving capture, detection and submission

pub mod orchestrator;
pub mod state;

pub use orchestrator::{AttendanceEvent, AttendanceOrchestrator, Timeouts};
pub use state::{CycleStats, DetectionOutcome, OrchestratorState, SubmissionResult};
