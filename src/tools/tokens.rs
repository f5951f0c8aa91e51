use serde::Deserialize;
use std::sync::Arc;

/// Estimates how many model tokens a piece of text costs.
///
/// Only used to decide when a view should be truncated, so a rough estimate
/// is fine. Any `Fn(&str) -> usize` works as an estimator.
pub trait TokenEstimator: Send + Sync {
    fn estimate_tokens(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn estimate_tokens(&self, text: &str) -> usize {
        self(text)
    }
}

pub type SharedTokenEstimator = Arc<dyn TokenEstimator>;

/// Counts whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Divides the byte length by a fixed ratio, rounding up.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.len().div_ceil(self.chars_per_token).max(1)
    }
}

/// Estimator selection as it appears in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Words,
    Chars,
}

impl EstimatorKind {
    pub fn build(self, chars_per_token: usize) -> SharedTokenEstimator {
        match self {
            EstimatorKind::Words => Arc::new(WordCountEstimator),
            EstimatorKind::Chars => Arc::new(CharRatioEstimator::new(chars_per_token)),
        }
    }
}
