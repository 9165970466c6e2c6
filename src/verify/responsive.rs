//! Responsive similarity from per-breakpoint layout sizes.

use crate::config::ResponsiveRules;

pub trait ResponsiveScorer: Send + Sync {
    /// Score one breakpoint from the number of laid-out elements on each
    /// side; `None` means that side has no layout data.
    fn score_breakpoint(&self, original: Option<usize>, clone: Option<usize>) -> f64;

    fn score(&self, breakpoints: &[(Option<usize>, Option<usize>)]) -> f64 {
        if breakpoints.is_empty() {
            return self.score_breakpoint(None, None);
        }
        let total: f64 = breakpoints
            .iter()
            .map(|(o, c)| self.score_breakpoint(*o, *c))
            .sum();
        total / breakpoints.len() as f64
    }
}

/// Banded `min/max` ratio of layout lengths, floored whenever data exists.
#[derive(Debug, Clone, Default)]
pub struct LengthBandScorer {
    rules: ResponsiveRules,
}

impl LengthBandScorer {
    pub fn new(rules: ResponsiveRules) -> Self {
        Self { rules }
    }
}

impl ResponsiveScorer for LengthBandScorer {
    fn score_breakpoint(&self, original: Option<usize>, clone: Option<usize>) -> f64 {
        let (Some(a), Some(b)) = (original, clone) else {
            return self.rules.missing;
        };
        if a == 0 && b == 0 {
            return self.rules.missing;
        }
        let ratio = a.min(b) as f64 / a.max(b) as f64;
        self.rules
            .bands
            .iter()
            .find(|band| ratio >= band.bound)
            .map(|band| band.score)
            .unwrap_or(self.rules.floor)
            .max(self.rules.floor)
    }
}
