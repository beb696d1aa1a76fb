//! Overlay rendering decisions
//!
//! Maps the orchestrator state onto the three things a kiosk screen shows:
//! the plain camera view, a processing indicator, or a result banner.

use crate::attendance::state::{OrchestratorState, SubmissionResult};
use std::fmt;

/// Message shown when the service could not match the frame
pub const NOT_FOUND_MESSAGE: &str = "Attendance not found";

/// What the kiosk should draw over the camera view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    /// Camera view only
    Quiescent,
    /// Detection or submission in progress
    Processing,
    /// A matched person
    Marked { name: String, roll_number: String },
    /// No match, malformed reply or service failure. All look the same.
    NotFound,
}

impl Overlay {
    pub fn from_state(state: &OrchestratorState) -> Self {
        match state {
            OrchestratorState::Idle | OrchestratorState::Stopped => Overlay::Quiescent,
            OrchestratorState::AwaitingDetection | OrchestratorState::Submitting => {
                Overlay::Processing
            }
            OrchestratorState::DisplayingResult(SubmissionResult::Identified {
                name,
                roll_number,
            }) => Overlay::Marked {
                name: name.clone(),
                roll_number: roll_number.clone(),
            },
            OrchestratorState::DisplayingResult(_) => Overlay::NotFound,
        }
    }

    /// Whether a banner is visible
    pub fn is_banner(&self) -> bool {
        matches!(self, Overlay::Marked { .. } | Overlay::NotFound)
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overlay::Quiescent => write!(f, ""),
            Overlay::Processing => write!(f, "Processing..."),
            Overlay::Marked { name, roll_number } => {
                write!(f, "Attendance marked: {} ({})", name, roll_number)
            }
            Overlay::NotFound => write!(f, "{}", NOT_FOUND_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_states() {
        assert_eq!(
            Overlay::from_state(&OrchestratorState::AwaitingDetection),
            Overlay::Processing
        );
        assert_eq!(
            Overlay::from_state(&OrchestratorState::Submitting),
            Overlay::Processing
        );
        assert_eq!(Overlay::from_state(&OrchestratorState::Idle), Overlay::Quiescent);
        assert_eq!(Overlay::from_state(&OrchestratorState::Stopped), Overlay::Quiescent);
    }

    #[test]
    fn test_identified_banner() {
        let overlay = Overlay::from_state(&OrchestratorState::DisplayingResult(
            SubmissionResult::Identified {
                name: "Bob".to_string(),
                roll_number: "17".to_string(),
            },
        ));

        assert!(overlay.is_banner());
        assert_eq!(overlay.to_string(), "Attendance marked: Bob (17)");
    }

    #[test]
    fn test_failures_share_not_found_banner() {
        for result in [SubmissionResult::NoMatch, SubmissionResult::TransportFailure] {
            let overlay = Overlay::from_state(&OrchestratorState::DisplayingResult(result));
            assert_eq!(overlay, Overlay::NotFound);
            assert_eq!(overlay.to_string(), NOT_FOUND_MESSAGE);
        }
    }
}
