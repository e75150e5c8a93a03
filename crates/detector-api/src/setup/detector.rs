//! Detection model loading

use anyhow::{Context, Result};
use detector_core::Config;
use detector_processing::{LabelSet, ObjectDetector};
use std::sync::Arc;

/// Label list from `DETECTION_LABELS_PATH`, or the built-in COCO list.
pub fn load_labels(config: &Config) -> Result<LabelSet> {
    let labels = match config.labels_path() {
        Some(path) => LabelSet::from_file(path)
            .with_context(|| format!("Failed to read label file {}", path.display()))?,
        None => LabelSet::coco(),
    };

    if labels.is_empty() {
        anyhow::bail!("Detection label list is empty");
    }

    Ok(labels)
}

#[cfg(feature = "onnx")]
pub fn load_detector(config: &Config) -> Result<Arc<dyn ObjectDetector>> {
    let labels = load_labels(config)?;
    let detector = detector_processing::OnnxDetector::load(config.model_path(), labels)
        .context("Failed to load detection model")?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
pub fn load_detector(config: &Config) -> Result<Arc<dyn ObjectDetector>> {
    load_labels(config)?;
    anyhow::bail!(
        "No detection backend compiled in; rebuild with `--features onnx` to load {}",
        config.model_path().display()
    )
}
