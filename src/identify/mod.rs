//! Identification service
//!
//! Frames with a face are submitted here for matching against known people.

pub mod client;
pub mod label;

pub use client::{HttpIdentificationClient, IdentificationOptions};
pub use label::{parse_label, parse_response};

use crate::attendance::state::SubmissionResult;
use crate::capture::Frame;
use crate::utils::error::AttendanceResult;
use async_trait::async_trait;

/// Remote identity matching.
///
/// `Ok` carries `Identified` or `NoMatch`. Errors mean the request failed in
/// transit; the orchestrator shows them as "not found".
#[async_trait]
pub trait IdentificationService: Send + Sync {
    async fn identify(&self, frame: &Frame) -> AttendanceResult<SubmissionResult>;
}
