//! Kiosk configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below. Command-line flags override file values.

use crate::attendance::orchestrator::Timeouts;
use crate::capture::traits::DEFAULT_JPEG_QUALITY;
use crate::identify::client::{
    IdentificationOptions, DEFAULT_ENDPOINT, DEFAULT_FIELD_NAME, DEFAULT_FILE_NAME,
};
use crate::utils::error::{AttendanceError, AttendanceResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceConfig {
    /// Sampling period in milliseconds
    pub period_ms: u64,

    /// How long a result banner stays up, in milliseconds
    pub dwell_ms: u64,

    /// Detector call bound; `null` waits forever
    pub detect_timeout_ms: Option<u64>,

    /// Identification call bound; `null` waits forever
    pub submit_timeout_ms: Option<u64>,

    /// Identification service URL
    pub endpoint: String,

    /// Multipart field carrying the image
    pub field_name: String,

    /// File name attached to the image part
    pub file_name: String,

    pub camera: CameraConfig,

    pub detector: DetectorConfig,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            period_ms: 3000,
            dwell_ms: 3000,
            detect_timeout_ms: Some(10_000),
            submit_timeout_ms: Some(15_000),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
            camera: CameraConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    /// Numeric index or backend device string; `None` picks the first camera
    pub device_id: Option<String>,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            width: 640,
            height: 480,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Which face detector to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    /// Submit every frame; the service decides
    AssumeFace,
    /// Local BlazeFace model (requires the `onnx` feature)
    Blazeface,
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorKind::AssumeFace => write!(f, "assume-face"),
            DetectorKind::Blazeface => write!(f, "blazeface"),
        }
    }
}

impl std::str::FromStr for DetectorKind {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assume-face" => Ok(DetectorKind::AssumeFace),
            "blazeface" => Ok(DetectorKind::Blazeface),
            other => Err(AttendanceError::Config(format!(
                "Unknown detector '{}', expected assume-face or blazeface",
                other
            ))),
        }
    }
}

/// Detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    pub model_path: Option<PathBuf>,
    pub confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::AssumeFace,
            model_path: None,
            confidence: 0.5,
        }
    }
}

impl AttendanceConfig {
    /// Read a config file
    pub fn load(path: &Path) -> AttendanceResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: AttendanceConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> AttendanceResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> AttendanceResult<()> {
        if self.period_ms == 0 {
            return Err(AttendanceError::Config(
                "periodMs must be greater than zero".to_string(),
            ));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(AttendanceError::Config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.field_name.trim().is_empty() {
            return Err(AttendanceError::Config("fieldName must not be empty".to_string()));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(AttendanceError::Config(
                "camera.jpegQuality must be between 1 and 100".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(AttendanceError::Config(
                "detector.confidence must be between 0 and 1".to_string(),
            ));
        }
        if self.detector.kind == DetectorKind::Blazeface && self.detector.model_path.is_none() {
            return Err(AttendanceError::Config(
                "detector.modelPath is required for blazeface".to_string(),
            ));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            detect: self.detect_timeout_ms.map(Duration::from_millis),
            submit: self.submit_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn identification_options(&self) -> IdentificationOptions {
        IdentificationOptions {
            endpoint: self.endpoint.clone(),
            field_name: self.field_name.clone(),
            file_name: self.file_name.clone(),
            request_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = AttendanceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.period(), Duration::from_secs(3));
        assert_eq!(config.timeouts().detect, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kiosk.json");
        fs::write(
            &path,
            r#"{"periodMs": 500, "submitTimeoutMs": null, "camera": {"deviceId": "1"}}"#,
        )
        .unwrap();

        let config = AttendanceConfig::load(&path).unwrap();
        assert_eq!(config.period_ms, 500);
        assert_eq!(config.dwell_ms, 3000);
        assert_eq!(config.submit_timeout_ms, None);
        assert_eq!(config.camera.device_id.as_deref(), Some("1"));
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kiosk.json");

        let mut config = AttendanceConfig::default();
        config.endpoint = "https://attendance.example.edu/check-face".to_string();
        config.detector.kind = DetectorKind::Blazeface;
        config.detector.model_path = Some(PathBuf::from("models/blazeface.onnx"));
        config.save(&path).unwrap();

        let loaded = AttendanceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = AttendanceConfig::default();
        config.period_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AttendanceConfig::default();
        config.endpoint = "localhost:5000".to_string();
        assert!(config.validate().is_err());

        let mut config = AttendanceConfig::default();
        config.detector.kind = DetectorKind::Blazeface;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detector_kind_from_str() {
        assert_eq!("blazeface".parse::<DetectorKind>().unwrap(), DetectorKind::Blazeface);
        assert!("haar".parse::<DetectorKind>().is_err());
    }
}
