//! Query category classification.
//!
//! The label model ranks category labels for normalized query text; the
//! [`CategoryClassifier`] turns that ranking into the category filter applied to
//! lexical retrieval. Low-confidence classifications fail open: no filter.

mod http;

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::normalize::{normalize_to_string_with, StemAlgorithm};

pub use http::HttpLabelPredictor;

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_TOP_K: usize = 1;
pub const DEFAULT_LABEL_PREFIX: &str = "__label__";

/// Ranked labels as returned by the model: parallel arrays, best first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Prediction {
    pub labels: Vec<String>,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    pub fn new(pairs: &[(&str, f32)]) -> Self {
        Self {
            labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
            probabilities: pairs.iter().map(|(_, p)| *p).collect(),
        }
    }
}

pub trait LabelPredictor: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict(&self, text: &str, k: usize) -> Result<Prediction>;
}

/// Ordered, duplicate-free category ids selected for filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilterSet(Vec<String>);

impl CategoryFilterSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.iter().any(|c| c == category)
    }

    fn push(&mut self, category: String) {
        if !self.contains(&category) {
            self.0.push(category);
        }
    }
}

/// Walk `(label, probability)` pairs in order, collecting labels until the
/// running probability reaches `threshold`. Returns an empty set if it never does.
pub fn accumulate_until_threshold<I>(ranked: I, threshold: f32) -> CategoryFilterSet
where
    I: IntoIterator<Item = (String, f32)>,
{
    let mut selected = CategoryFilterSet::default();
    let mut total = 0.0f32;

    for (label, probability) in ranked {
        total += probability;
        selected.push(label);
        if total >= threshold {
            return selected;
        }
    }

    CategoryFilterSet::default()
}

pub struct CategoryClassifier {
    predictor: Arc<dyn LabelPredictor>,
    threshold: f32,
    top_k: usize,
    label_prefix: String,
    stemmer: StemAlgorithm,
}

impl CategoryClassifier {
    pub fn new(predictor: Arc<dyn LabelPredictor>) -> Self {
        Self {
            predictor,
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            stemmer: StemAlgorithm::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Must match the stemmer applied to the label model's training text.
    pub fn with_stemmer(mut self, stemmer: StemAlgorithm) -> Self {
        self.stemmer = stemmer;
        self
    }

    pub fn classify(&self, query: &str) -> Result<CategoryFilterSet> {
        let normalized = normalize_to_string_with(query, self.stemmer);
        if normalized.is_empty() {
            debug!("query" = query, "msg" = "nothing to classify after normalization");
            return Ok(CategoryFilterSet::default());
        }

        let prediction = self.predictor.predict(&normalized, self.top_k)?;
        let categories = self.select(prediction)?;

        if categories.is_empty() {
            info!("query" = query, "msg" = "no categories found");
        } else {
            info!("query" = query, "categories" = ?categories.as_slice(), "msg" = "categories found");
        }
        Ok(categories)
    }

    fn select(&self, prediction: Prediction) -> Result<CategoryFilterSet> {
        if prediction.labels.len() != prediction.probabilities.len() {
            bail!(
                "{} returned {} labels but {} probabilities",
                self.predictor.name(),
                prediction.labels.len(),
                prediction.probabilities.len()
            );
        }

        let ranked = prediction
            .labels
            .into_iter()
            .zip(prediction.probabilities)
            .filter(|(_, p)| p.is_finite() && *p >= 0.0)
            .map(|(label, p)| (self.strip_prefix(&label), p))
            .filter(|(label, _)| !label.is_empty());

        Ok(accumulate_until_threshold(ranked, self.threshold))
    }

    fn strip_prefix(&self, label: &str) -> String {
        label
            .strip_prefix(self.label_prefix.as_str())
            .unwrap_or(label)
            .to_string()
    }
}
