//! Object detection adapter
//!
//! [`ObjectDetector`] hides the model behind a single call: decoded image in,
//! labelled boxes out. The production backend is [`OnnxDetector`] (cargo feature
//! `onnx`); tests plug in their own implementations.

use crate::labels::LabelSet;
use image::DynamicImage;

/// Detection errors
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Failed to load detection model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
}

/// Axis-aligned box in source image pixels, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// One object found by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub bbox: BoundingBox,
    /// Confidence in `[0, 1]`
    pub score: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, bbox: BoundingBox, score: f32) -> Self {
        Self {
            label: label.into(),
            bbox,
            score,
        }
    }
}

/// A loaded detection model.
///
/// `detect` runs one inference per call and returns detections in model output
/// order. It is CPU-bound and blocking; async callers should run it on the
/// blocking thread pool.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError>;

    /// Class names the model can produce.
    fn labels(&self) -> &LabelSet;
}

#[cfg(feature = "onnx")]
mod onnx {
    use super::{BoundingBox, Detection, DetectionError, ObjectDetector};
    use crate::labels::LabelSet;
    use image::DynamicImage;
    use ndarray::Array3;
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::TensorRef;
    use std::path::Path;
    use std::sync::Mutex;

    /// ONNX export of a torchvision-style detector.
    ///
    /// Input is one `[3, H, W]` float tensor scaled to `[0, 1]`. Outputs are, in
    /// order, `boxes [N, 4]`, `labels [N]` (i64 class ids) and `scores [N]`.
    pub struct OnnxDetector {
        // Session::run needs exclusive access
        session: Mutex<Session>,
        labels: LabelSet,
    }

    impl OnnxDetector {
        pub fn load(model_path: &Path, labels: LabelSet) -> Result<Self, DetectionError> {
            if !model_path.exists() {
                return Err(DetectionError::ModelLoad(format!(
                    "model file not found: {}",
                    model_path.display()
                )));
            }

            tracing::info!(path = %model_path.display(), "Loading detection model");

            let session = Session::builder()
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|b| b.commit_from_file(model_path))
                .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;

            tracing::info!(
                path = %model_path.display(),
                label_count = labels.len(),
                "Detection model loaded"
            );

            Ok(Self {
                session: Mutex::new(session),
                labels,
            })
        }

        fn to_tensor(image: &DynamicImage) -> Array3<f32> {
            let rgb = image.to_rgb8();
            let (width, height) = rgb.dimensions();
            let mut tensor = Array3::<f32>::zeros((3, height as usize, width as usize));
            for (x, y, pixel) in rgb.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
                }
            }
            tensor
        }
    }

    impl ObjectDetector for OnnxDetector {
        fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
            let start = std::time::Instant::now();
            let tensor = Self::to_tensor(image);
            let input = TensorRef::from_array_view(&tensor)
                .map_err(|e| DetectionError::Inference(e.to_string()))?;

            let mut session = self
                .session
                .lock()
                .map_err(|_| DetectionError::Inference("model session poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| DetectionError::Inference(e.to_string()))?;

            if outputs.len() < 3 {
                return Err(DetectionError::InvalidOutput(format!(
                    "expected 3 outputs (boxes, labels, scores), got {}",
                    outputs.len()
                )));
            }

            let (_, boxes) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectionError::InvalidOutput(format!("boxes: {}", e)))?;
            let (_, class_ids) = outputs[1]
                .try_extract_tensor::<i64>()
                .map_err(|e| DetectionError::InvalidOutput(format!("labels: {}", e)))?;
            let (_, scores) = outputs[2]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectionError::InvalidOutput(format!("scores: {}", e)))?;

            if boxes.len() != class_ids.len() * 4 || scores.len() != class_ids.len() {
                return Err(DetectionError::InvalidOutput(format!(
                    "mismatched output lengths: boxes={}, labels={}, scores={}",
                    boxes.len(),
                    class_ids.len(),
                    scores.len()
                )));
            }

            let mut detections = Vec::with_capacity(class_ids.len());
            for (i, (&class_id, &score)) in class_ids.iter().zip(scores).enumerate() {
                let Some(label) = usize::try_from(class_id)
                    .ok()
                    .and_then(|id| self.labels.name(id))
                else {
                    tracing::debug!(class_id, "Skipping detection with unknown class id");
                    continue;
                };
                let b = &boxes[i * 4..i * 4 + 4];
                detections.push(Detection::new(
                    label,
                    BoundingBox::new(b[0], b[1], b[2], b[3]),
                    score,
                ));
            }

            tracing::debug!(
                detections = detections.len(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Inference complete"
            );

            Ok(detections)
        }

        fn labels(&self) -> &LabelSet {
            &self.labels
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;
