//! Query text normalization shared by classification and label preparation.
//!
//! Lowercases, treats every character outside `[a-z0-9]` as a separator and
//! stems each surviving token. The default stemmer is classic Porter, the one
//! the label model's training text goes through; Snowball English (Porter2)
//! is available for models trained on that instead.

mod porter;

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use serde::Deserialize;

static SNOWBALL_ENGLISH: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemAlgorithm {
    /// Porter (1980) as implemented by NLTK's `PorterStemmer`
    #[default]
    Porter,
    /// Snowball English
    Porter2,
}

impl StemAlgorithm {
    pub fn stem(&self, word: &str) -> String {
        match self {
            StemAlgorithm::Porter => porter::stem(word),
            StemAlgorithm::Porter2 => SNOWBALL_ENGLISH.stem(word).into_owned(),
        }
    }
}

/// Normalize free text into lowercase tokens stemmed with `algorithm`. Never yields empty tokens.
pub fn normalize_with(text: &str, algorithm: StemAlgorithm) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| algorithm.stem(word))
        .filter(|token| !token.is_empty())
        .collect()
}

pub fn normalize(text: &str) -> Vec<String> {
    normalize_with(text, StemAlgorithm::default())
}

/// Space-joined form of [`normalize_with`], the shape the label model was trained on.
pub fn normalize_to_string_with(text: &str, algorithm: StemAlgorithm) -> String {
    normalize_with(text, algorithm).join(" ")
}

pub fn normalize_to_string(text: &str) -> String {
    normalize_to_string_with(text, StemAlgorithm::default())
}
