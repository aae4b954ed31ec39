//! ONNX image classification backend
//!
//! Expects an ImageNet-style network taking a `1x3xNxN` f32 tensor and
//! producing one score per class, plus a labels file with one class per
//! line in output order.

use super::{ImageModel, Prediction};
use crate::error::{PantryError, Result};
use image::imageops::FilterType;
use std::path::Path;
use tract_onnx::prelude::*;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// An optimized ONNX network with its class labels
pub struct OnnxModel {
    plan: TypedRunnableModel<TypedModel>,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxModel {
    /// Load and optimize a network
    ///
    /// # Errors
    ///
    /// Returns error if either file cannot be read or the network does not
    /// accept a `1x3xNxN` f32 input
    pub fn load(model_path: &Path, labels_path: &Path, input_size: u32) -> Result<Self> {
        let labels = load_labels(labels_path)?;
        let size = input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| {
                PantryError::Classifier(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        tracing::info!(
            model = %model_path.display(),
            classes = labels.len(),
            input_size,
            "Loaded ONNX classifier"
        );

        Ok(Self {
            plan,
            labels,
            input_size,
        })
    }

    fn to_tensor(&self, image: &image::DynamicImage) -> Tensor {
        let size = self.input_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, c, y, x)| {
                let value = rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
                (value - MEAN[c]) / STD[c]
            },
        )
        .into()
    }
}

impl ImageModel for OnnxModel {
    fn predict(&self, image: &image::DynamicImage) -> Result<Vec<Prediction>> {
        let input = self.to_tensor(image);
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| PantryError::Classifier(format!("Inference failed: {}", e)))?;

        let output = outputs
            .first()
            .ok_or_else(|| PantryError::Classifier("Model produced no output".to_string()))?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| PantryError::Classifier(format!("Unexpected output type: {}", e)))?
            .iter()
            .copied()
            .collect();

        scores_to_predictions(&scores, &self.labels)
    }
}

/// Pair raw scores with labels
///
/// Logits are turned into probabilities with softmax; output that already
/// sums to one is used as is. Networks with a leading background class
/// produce one more score than there are labels, and that score is dropped.
pub(crate) fn scores_to_predictions(scores: &[f32], labels: &[String]) -> Result<Vec<Prediction>> {
    let scores = if scores.len() == labels.len() + 1 {
        &scores[1..]
    } else {
        scores
    };

    if scores.len() != labels.len() {
        return Err(PantryError::Classifier(format!(
            "Model produced {} scores for {} labels",
            scores.len(),
            labels.len()
        ))
        .into());
    }

    let probabilities = if looks_like_probabilities(scores) {
        scores.to_vec()
    } else {
        softmax(scores)
    };

    Ok(labels
        .iter()
        .zip(probabilities)
        .map(|(label, confidence)| Prediction::new(label.clone(), confidence))
        .collect())
}

fn looks_like_probabilities(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        PantryError::Classifier(format!("Failed to read labels {}: {}", path.display(), e))
    })?;

    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(normalize_label)
        .collect();

    if labels.is_empty() {
        return Err(PantryError::Classifier(format!(
            "Labels file {} is empty",
            path.display()
        ))
        .into());
    }
    Ok(labels)
}

/// Reduce a raw class label to a display name
///
/// Drops a leading WordNet id and everything after the first comma.
///
/// # Examples
///
/// ```
/// use pantrygenie::classifier::onnx::normalize_label;
///
/// assert_eq!(normalize_label("n07753592 banana"), "banana");
/// assert_eq!(normalize_label("hotdog, hot dog, red hot"), "hotdog");
/// assert_eq!(normalize_label("Granny_Smith"), "Granny Smith");
/// ```
pub fn normalize_label(raw: &str) -> String {
    let raw = raw.trim();
    let raw = match raw.split_once(char::is_whitespace) {
        Some((id, rest)) if is_wordnet_id(id) => rest,
        _ => raw,
    };
    let name = raw.split(',').next().unwrap_or(raw);
    name.replace('_', " ").trim().to_string()
}

fn is_wordnet_id(token: &str) -> bool {
    token.len() == 9
        && token.starts_with('n')
        && token[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_label_variants() {
        assert_eq!(normalize_label("n07753592 banana"), "banana");
        assert_eq!(normalize_label("banana, plantain"), "banana");
        assert_eq!(normalize_label("  lemon  "), "lemon");
        assert_eq!(normalize_label("n0775 banana"), "n0775 banana");
    }

    #[test]
    fn test_softmax_applied_to_logits() {
        let predictions =
            scores_to_predictions(&[2.0, 1.0, 0.0], &labels(&["a", "b", "c"])).unwrap();
        let total: f32 = predictions.iter().map(|p| p.confidence).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(predictions[0].confidence > predictions[1].confidence);
    }

    #[test]
    fn test_probabilities_passed_through() {
        let predictions = scores_to_predictions(&[0.7, 0.2, 0.1], &labels(&["a", "b", "c"])).unwrap();
        assert_eq!(predictions[0], Prediction::new("a", 0.7));
    }

    #[test]
    fn test_background_class_dropped() {
        let predictions =
            scores_to_predictions(&[0.5, 0.3, 0.2], &labels(&["apple", "egg"])).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].label, "apple");
    }

    #[test]
    fn test_score_count_mismatch_is_error() {
        assert!(scores_to_predictions(&[0.1], &labels(&["a", "b", "c"])).is_err());
    }

    #[test]
    fn test_load_labels_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "n07753592 banana\n\nn07747607 orange\n").unwrap();
        assert_eq!(load_labels(&path).unwrap(), labels(&["banana", "orange"]));
    }

    #[test]
    fn test_missing_model_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let labels_path = dir.path().join("labels.txt");
        std::fs::write(&labels_path, "banana\n").unwrap();
        let result = OnnxModel::load(&dir.path().join("missing.onnx"), &labels_path, 224);
        assert!(result.is_err());
    }
}
