//! Attendance Kiosk - camera-driven attendance marking.
//!
//! This is the main library crate. It samples frames from a camera, checks
//! them for a face and submits face frames to a remote identification
//! service, showing each result for a fixed dwell time.

pub mod attendance;
pub mod capture;
pub mod config;
pub mod detector;
pub mod identify;
pub mod presentation;
pub mod utils;

pub use attendance::{AttendanceEvent, AttendanceOrchestrator, OrchestratorState, SubmissionResult};
pub use config::AttendanceConfig;
pub use utils::error::{AttendanceError, AttendanceResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_kiosk=debug,reqwest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
