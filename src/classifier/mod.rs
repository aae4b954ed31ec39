//! Local ingredient recognition
//!
//! A pre-trained image classification network runs in-process over a photo
//! and proposes labels the user can add as inventory items. The network is
//! loaded on first use and kept for the rest of the process.

use crate::config::ClassifierConfig;
use crate::error::{PantryError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub mod onnx;
pub use onnx::OnnxModel;

/// One label proposed for an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Display name of the detected class
    pub label: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A loaded image classification network
///
/// Returns a prediction for every class it knows; filtering happens in
/// [`Classifier`].
#[cfg_attr(test, mockall::automock)]
pub trait ImageModel: Send + Sync {
    fn predict(&self, image: &image::DynamicImage) -> Result<Vec<Prediction>>;
}

/// Loads the network on first use
pub type ModelLoader = Arc<dyn Fn() -> Result<Arc<dyn ImageModel>> + Send + Sync>;

/// Post-processing applied to raw model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOptions {
    pub top_k: usize,
    pub min_confidence: f32,
    pub food_filter: bool,
}

impl From<&ClassifierConfig> for SelectionOptions {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            top_k: config.top_k,
            min_confidence: config.min_confidence,
            food_filter: config.food_filter,
        }
    }
}

/// Words that mark a class label as something edible
const FOOD_WORDS: &[&str] = &[
    "apple", "artichoke", "bagel", "banana", "bean", "beef", "bread", "broccoli", "burrito",
    "butter", "cabbage", "carbonara", "cardoon", "carrot", "cauliflower", "cheese", "cheeseburger",
    "chicken", "chocolate", "coffee", "corn", "cucumber", "custard", "dough", "egg", "espresso",
    "fig", "fish", "flour", "guacamole", "hotdog", "hot dog", "ice cream", "jackfruit", "lemon",
    "lettuce", "meat", "meatloaf", "milk", "mushroom", "onion", "orange", "pasta", "pepper",
    "pineapple", "pizza", "pomegranate", "potato", "pretzel", "rice", "salmon", "sauce", "soup",
    "spaghetti", "squash", "strawberry", "sugar", "tomato", "trifle", "wine", "zucchini",
];

/// Whether a label names a food, by whole-word match against a fixed list
///
/// # Examples
///
/// ```
/// use pantrygenie::classifier::is_food_label;
///
/// assert!(is_food_label("Granny Smith apple"));
/// assert!(is_food_label("ice cream"));
/// assert!(!is_food_label("pineapple crate"));
/// assert!(!is_food_label("golden retriever"));
/// ```
pub fn is_food_label(label: &str) -> bool {
    let normalized = label.to_lowercase().replace(['-', '_'], " ");
    let words: Vec<&str> = normalized.split_whitespace().collect();
    // The last word is the head noun ("pineapple crate" is a crate)
    let Some(head) = words.last() else {
        return false;
    };

    FOOD_WORDS.iter().any(|food| {
        if food.contains(' ') {
            normalized.ends_with(food)
        } else {
            *head == *food
                || head.strip_suffix('s') == Some(*food)
                || head.strip_suffix("es") == Some(*food)
        }
    })
}

/// Filter, sort and truncate raw predictions
///
/// Drops anything below `min_confidence` (and non-food labels when the food
/// filter is on), keeps the best score per label, sorts by descending
/// confidence and keeps at most `top_k`.
pub fn select_predictions(
    predictions: Vec<Prediction>,
    options: &SelectionOptions,
) -> Vec<Prediction> {
    let mut selected: Vec<Prediction> = predictions
        .into_iter()
        .filter(|p| p.confidence.is_finite() && p.confidence >= options.min_confidence)
        .filter(|p| !options.food_filter || is_food_label(&p.label))
        .collect();

    selected.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut seen = std::collections::HashSet::new();
    selected.retain(|p| seen.insert(p.label.to_lowercase()));
    selected.truncate(options.top_k);
    selected
}

/// Lazily loaded classifier shared across the process
pub struct Classifier {
    loader: ModelLoader,
    model: OnceCell<Arc<dyn ImageModel>>,
    options: SelectionOptions,
}

impl Classifier {
    /// Create a classifier that loads its network with `loader` on first use
    pub fn new(loader: ModelLoader, options: SelectionOptions) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            options,
        }
    }

    /// Create a classifier backed by the ONNX network named in config
    ///
    /// Missing paths are only reported when a classification is attempted.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let config = config.clone();
        let options = SelectionOptions::from(&config);
        let loader: ModelLoader = Arc::new(move || {
            let model_path = config.model_path.as_deref().ok_or_else(|| {
                PantryError::Config(
                    "classifier.model_path is not set (PANTRY_CLASSIFIER_MODEL)".to_string(),
                )
            })?;
            let labels_path = config.labels_path.as_deref().ok_or_else(|| {
                PantryError::Config(
                    "classifier.labels_path is not set (PANTRY_CLASSIFIER_LABELS)".to_string(),
                )
            })?;
            let model = OnnxModel::load(model_path, labels_path, config.input_size)?;
            Ok(Arc::new(model) as Arc<dyn ImageModel>)
        });
        Self::new(loader, options)
    }

    /// Whether the network has been loaded
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Classify encoded image bytes (JPEG, PNG, ...)
    ///
    /// # Errors
    ///
    /// Returns error if the network cannot be loaded, the bytes are not a
    /// supported image, or inference fails. A failed load is retried on the
    /// next call.
    pub async fn classify(&self, image_bytes: &[u8]) -> Result<Vec<Prediction>> {
        let model = self.model().await?;
        let bytes = image_bytes.to_vec();

        let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Prediction>> {
            let image = image::load_from_memory(&bytes).map_err(PantryError::from)?;
            model.predict(&image)
        })
        .await
        .map_err(|e| PantryError::Classifier(format!("Classification task failed: {}", e)))??;

        let selected = select_predictions(raw, &self.options);
        tracing::debug!(count = selected.len(), "Classified image");
        Ok(selected)
    }

    /// Classify an image file
    pub async fn classify_path(&self, path: &Path) -> Result<Vec<Prediction>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PantryError::Classifier(format!("Failed to read {}: {}", path.display(), e)))?;
        self.classify(&bytes).await
    }

    async fn model(&self) -> Result<Arc<dyn ImageModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                tracing::info!("Loading image classifier");
                let loaded: Result<Arc<dyn ImageModel>> =
                    match tokio::task::spawn_blocking(move || loader()).await {
                        Ok(result) => result,
                        Err(e) => Err(PantryError::Classifier(format!(
                            "Model load task failed: {}",
                            e
                        ))
                        .into()),
                    };
                if let Err(e) = &loaded {
                    tracing::error!("Failed to load image classifier: {:#}", e);
                }
                loaded
            })
            .await?;
        Ok(Arc::clone(model))
    }
}
