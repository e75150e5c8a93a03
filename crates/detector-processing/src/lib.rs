//! Detector Processing Library
//!
//! Everything that touches pixels: upload validation, the object detection
//! adapter and the annotation renderer.

pub mod detection;
pub mod labels;
pub mod render;
pub mod validator;

pub use detection::{BoundingBox, Detection, DetectionError, ObjectDetector};
#[cfg(feature = "onnx")]
pub use detection::OnnxDetector;
pub use labels::LabelSet;
pub use render::{encode_jpeg, AnnotationRenderer, RenderError, SCORE_THRESHOLD};
pub use validator::{UploadValidator, ValidationError};
