//! HTTP identification client
//!
//! Posts the frame as a single-part multipart form and parses the JSON reply.

use super::label::parse_response;
use super::IdentificationService;
use crate::attendance::state::SubmissionResult;
use crate::capture::Frame;
use crate::utils::error::{AttendanceError, AttendanceResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Default identification endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/check-face";

/// Multipart field carrying the image
pub const DEFAULT_FIELD_NAME: &str = "File1";

/// File name attached to the image part
pub const DEFAULT_FILE_NAME: &str = "webcam_image.jpg";

/// Wire options for the identification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationOptions {
    pub endpoint: String,
    pub field_name: String,
    pub file_name: String,
    /// Per-request HTTP timeout
    pub request_timeout: Option<Duration>,
}

impl Default for IdentificationOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            request_timeout: None,
        }
    }
}

/// Identification service reached over HTTP
pub struct HttpIdentificationClient {
    client: reqwest::Client,
    options: IdentificationOptions,
}

impl HttpIdentificationClient {
    /// Create a client for `endpoint` with the default field and file names
    pub fn new(endpoint: impl Into<String>) -> AttendanceResult<Self> {
        Self::with_options(IdentificationOptions {
            endpoint: endpoint.into(),
            ..IdentificationOptions::default()
        })
    }

    /// Create a client with custom wire options
    pub fn with_options(options: IdentificationOptions) -> AttendanceResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, options })
    }

    pub fn endpoint(&self) -> &str {
        &self.options.endpoint
    }

    fn form(&self, frame: &Frame) -> AttendanceResult<Form> {
        let part = Part::bytes(frame.bytes().to_vec())
            .file_name(self.options.file_name.clone())
            .mime_str(frame.mime())?;
        Ok(Form::new().part(self.options.field_name.clone(), part))
    }
}

#[async_trait]
impl IdentificationService for HttpIdentificationClient {
    async fn identify(&self, frame: &Frame) -> AttendanceResult<SubmissionResult> {
        let form = self.form(frame)?;

        let resp = self
            .client
            .post(&self.options.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AttendanceError::Transport(format!(
                "Identification failed: {} - {}",
                status, body
            )));
        }

        let body = resp.bytes().await?;
        match parse_response(&body) {
            Ok(result) => {
                tracing::debug!(?result, "Identification response parsed");
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identification response unparseable, treating as no match");
                Ok(SubmissionResult::NoMatch)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = IdentificationOptions::default();
        assert_eq!(options.endpoint, "http://localhost:5000/check-face");
        assert_eq!(options.field_name, "File1");
        assert_eq!(options.file_name, "webcam_image.jpg");
        assert!(options.request_timeout.is_none());
    }

    #[test]
    fn test_new_keeps_default_wire_names() {
        let client = HttpIdentificationClient::new("http://127.0.0.1:9/match").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/match");
        assert_eq!(client.options.field_name, DEFAULT_FIELD_NAME);
    }
}
