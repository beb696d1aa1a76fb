//! Shared utilities

pub mod error;

pub use error::{AttendanceError, AttendanceResult, ErrorReport};
