//! Structural similarity from coarse element counts.

use crate::config::StructuralRules;
use crate::types::StructureCounts;

pub trait StructuralScorer: Send + Sync {
    fn score(&self, original: Option<&StructureCounts>, clone: Option<&StructureCounts>) -> f64;
}

/// Per-category `min/max` ratios with leniency, averaged over the seven
/// count categories.
#[derive(Debug, Clone, Default)]
pub struct CountRatioScorer {
    rules: StructuralRules,
}

impl CountRatioScorer {
    pub fn new(rules: StructuralRules) -> Self {
        Self { rules }
    }

    fn category(&self, original: usize, clone: usize) -> f64 {
        match (original, clone) {
            (0, 0) => 1.0,
            (0, _) | (_, 0) => self.rules.one_side_zero,
            (a, b) => {
                let ratio = a.min(b) as f64 / a.max(b) as f64;
                (ratio * self.rules.leniency).min(1.0)
            }
        }
    }
}

impl StructuralScorer for CountRatioScorer {
    fn score(&self, original: Option<&StructureCounts>, clone: Option<&StructureCounts>) -> f64 {
        let (original, clone) = match (original, clone) {
            (Some(o), Some(c)) => (o, c),
            (None, None) => return self.rules.both_missing,
            _ => return self.rules.one_missing,
        };
        let pairs = original.categories().into_iter().zip(clone.categories());
        let scores: Vec<f64> = pairs.map(|((_, a), (_, b))| self.category(a, b)).collect();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        if clone.has_meaningful_content() {
            (mean * self.rules.content_boost).min(1.0)
        } else {
            mean
        }
    }
}

/// Count-ratio comparison with the default rules.
pub fn compare_structural_fidelity(
    original: Option<&StructureCounts>,
    clone: Option<&StructureCounts>,
) -> f64 {
    CountRatioScorer::default().score(original, clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: usize, text: usize, images: usize, headings: usize) -> StructureCounts {
        StructureCounts {
            total_elements: total,
            text_nodes: text,
            images,
            sections: 1,
            containers: total / 2,
            headings,
            links: 3,
        }
    }

    #[test]
    fn identical_structures_score_high() {
        let page = counts(40, 12, 3, 2);
        assert!(compare_structural_fidelity(Some(&page), Some(&page)) >= 0.9);
    }

    #[test]
    fn missing_structures_are_lenient() {
        assert_eq!(compare_structural_fidelity(None, None), 0.8);
        let page = counts(40, 12, 3, 2);
        assert_eq!(compare_structural_fidelity(Some(&page), None), 0.5);
        assert_eq!(compare_structural_fidelity(None, Some(&page)), 0.5);
    }

    #[test]
    fn empty_structures_match_each_other() {
        let empty = StructureCounts::default();
        assert_eq!(compare_structural_fidelity(Some(&empty), Some(&empty)), 1.0);
    }

    #[test]
    fn one_sided_categories_get_partial_credit() {
        let scorer = CountRatioScorer::default();
        assert_eq!(scorer.category(0, 5), 0.3);
        assert_eq!(scorer.category(10, 5), 0.7);
        assert_eq!(scorer.category(10, 9), 1.0);
    }

    #[test]
    fn clone_content_boosts_the_score() {
        let original = counts(100, 40, 10, 6);
        let clone = counts(30, 10, 2, 2);
        let plain = CountRatioScorer::new(StructuralRules {
            content_boost: 1.0,
            ..StructuralRules::default()
        });
        let boosted = compare_structural_fidelity(Some(&original), Some(&clone));
        let unboosted = plain.score(Some(&original), Some(&clone));
        assert!(boosted > unboosted);
        assert!(boosted <= 1.0);
    }
}
