//! BlazeFace face detector using ONNX Runtime via `ort`.
//!
//! Short-range BlazeFace model. Only the number of faces above the confidence
//! threshold is reported; box geometry is used for suppression and dropped.

use super::FaceDetector;
use crate::attendance::state::DetectionOutcome;
use crate::capture::Frame;
use crate::utils::error::{AttendanceError, AttendanceResult};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::RgbImage;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// BlazeFace detector. The ONNX session is created by `warm_up`.
pub struct BlazefaceDetector {
    model_path: PathBuf,
    confidence: f32,
    session: Arc<Mutex<Option<ort::session::Session>>>,
    anchors: Arc<Vec<[f32; 2]>>,
}

impl BlazefaceDetector {
    pub fn new(model_path: PathBuf, confidence: f32) -> Self {
        Self {
            model_path,
            confidence,
            session: Arc::new(Mutex::new(None)),
            anchors: Arc::new(generate_anchors()),
        }
    }
}

#[async_trait]
impl FaceDetector for BlazefaceDetector {
    fn name(&self) -> &str {
        "blazeface"
    }

    async fn warm_up(&self) -> AttendanceResult<()> {
        if self.session.lock().is_some() {
            return Ok(());
        }

        let path = self.model_path.clone();
        let session = tokio::task::spawn_blocking(move || {
            let builder = ort::session::Session::builder().map_err(detection_error)?;
            builder
                .commit_from_file(&path)
                .map_err(|e| AttendanceError::Detection(format!("Failed to load {:?}: {}", path, e)))
        })
        .await
        .map_err(|e| AttendanceError::Detection(format!("Model loader panicked: {}", e)))??;

        tracing::info!("Loaded BlazeFace model from {:?}", self.model_path);
        *self.session.lock() = Some(session);
        Ok(())
    }

    async fn detect(&self, frame: &Frame) -> AttendanceResult<DetectionOutcome> {
        let image = frame.decode_rgb()?;
        let session = self.session.clone();
        let anchors = self.anchors.clone();
        let confidence = self.confidence;

        let count = tokio::task::spawn_blocking(move || {
            let mut guard = session.lock();
            let session = guard
                .as_mut()
                .ok_or_else(|| AttendanceError::Detection("Model not loaded".to_string()))?;
            run_model(session, &image, &anchors, confidence)
        })
        .await
        .map_err(|e| AttendanceError::Detection(format!("Detector task panicked: {}", e)))??;

        Ok(DetectionOutcome::from_count(count))
    }
}

fn run_model(
    session: &mut ort::session::Session,
    image: &RgbImage,
    anchors: &[[f32; 2]],
    confidence: f32,
) -> AttendanceResult<usize> {
    let input_value =
        ort::value::Tensor::from_array(preprocess(image, INPUT_SIZE)).map_err(detection_error)?;
    let outputs = session
        .run(ort::inputs![input_value])
        .map_err(detection_error)?;

    // regressors: [1, 896, 16], classificators: [1, 896, 1]
    if outputs.len() < 2 {
        return Err(AttendanceError::Detection(format!(
            "BlazeFace model expected 2 outputs, got {}",
            outputs.len()
        )));
    }

    let regressors = outputs[0]
        .try_extract_array::<f32>()
        .map_err(detection_error)?;
    let scores = outputs[1]
        .try_extract_array::<f32>()
        .map_err(detection_error)?;
    let reg_data = regressors
        .as_slice()
        .ok_or_else(|| AttendanceError::Detection("Cannot get regressor slice".to_string()))?;
    let score_data = scores
        .as_slice()
        .ok_or_else(|| AttendanceError::Detection("Cannot get score slice".to_string()))?;

    let mut raw_dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[reg_offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[reg_offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[reg_offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[reg_offset + 3] / INPUT_SIZE as f32;

        raw_dets.push(RawDet {
            x1: (cx - w / 2.0).max(0.0),
            y1: (cy - h / 2.0).max(0.0),
            x2: (cx + w / 2.0).min(1.0),
            y2: (cy + h / 2.0).min(1.0),
            score,
        });
    }

    Ok(nms(&mut raw_dets, NMS_IOU_THRESH).len())
}

fn detection_error(e: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::Detection(e.to_string())
}

/// Resize to `size × size` and normalize to [0,1] NCHW float32.
fn preprocess(image: &RgbImage, size: u32) -> ndarray::Array4<f32> {
    let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
    let s = size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Short-range anchors: 16×16 grid with 2 per cell, 8×8 grid with 6 per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[derive(Clone, Debug)]
struct RawDet {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

fn nms(dets: &mut [RawDet], iou_thresh: f32) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDet> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(k, det) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
