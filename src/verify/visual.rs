//! Visual similarity strategies.

use crate::config::{VisualMethod, VisualRules};

pub trait VisualScorer: Send + Sync {
    fn method(&self) -> VisualMethod;

    /// Similarity in [0, 1] of two encoded screenshots.
    fn score(&self, original: &[u8], clone: &[u8]) -> f64;
}

/// Compares encoded screenshot sizes and maps the relative difference onto
/// fixed buckets. It never decodes pixels, so it is an approximation: two
/// unrelated pages of similar complexity score well.
#[derive(Debug, Clone, Default)]
pub struct ByteSizeProxy {
    rules: VisualRules,
}

impl ByteSizeProxy {
    pub fn new(rules: VisualRules) -> Self {
        Self { rules }
    }
}

/// `|a - b| / max(a, b)`; zero when both are empty.
pub fn size_difference_ratio(a: usize, b: usize) -> f64 {
    let larger = a.max(b);
    if larger == 0 {
        return 0.0;
    }
    a.abs_diff(b) as f64 / larger as f64
}

impl VisualScorer for ByteSizeProxy {
    fn method(&self) -> VisualMethod {
        VisualMethod::ByteSizeProxy
    }

    fn score(&self, original: &[u8], clone: &[u8]) -> f64 {
        if original.is_empty() || clone.is_empty() {
            return self.rules.floor;
        }
        let ratio = size_difference_ratio(original.len(), clone.len());
        self.rules
            .buckets
            .iter()
            .find(|band| ratio <= band.bound)
            .map(|band| band.score)
            .unwrap_or(self.rules.floor)
    }
}

/// Byte-size comparison with the default buckets.
pub fn compare_screenshots(original: &[u8], clone: &[u8]) -> f64 {
    ByteSizeProxy::default().score(original, clone)
}

/// Mean of the available per-breakpoint scores; zero when there are none.
pub fn average_visual(scores: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = scores.iter().flatten().copied().collect();
    if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    }
}
