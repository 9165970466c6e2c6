//! Combining sub-scores into the overall fidelity score.

use crate::config::{FallbackScores, FloorRules, ScoreWeights};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    pub structural: f64,
    /// `None` when the visual strategy is disabled; its weight is then
    /// shared by the other two.
    pub visual: Option<f64>,
    pub responsive: f64,
}

impl SubScores {
    pub fn from_fallback(scores: &FallbackScores, visual_enabled: bool) -> Self {
        Self {
            structural: scores.structural,
            visual: visual_enabled.then_some(scores.visual),
            responsive: scores.responsive,
        }
    }
}

/// Weighted mean of the active sub-scores.
pub fn weighted_score(scores: &SubScores, weights: &ScoreWeights) -> f64 {
    let mut total = weights.structural * scores.structural + weights.responsive * scores.responsive;
    let mut weight = weights.structural + weights.responsive;
    if let Some(visual) = scores.visual {
        total += weights.visual * visual;
        weight += weights.visual;
    }
    if weight > 0.0 {
        total / weight
    } else {
        0.0
    }
}

/// Weighted score with the boost and floor rules applied, within [0, 1].
///
/// Below `boost_below`, a structural or visual sub-score above
/// `boost_trigger` lifts the result by `boost_factor` to at least
/// `boost_floor`. Otherwise the result is floored at `data_floor` whenever
/// any comparison data existed.
pub fn overall_score(
    scores: &SubScores,
    weights: &ScoreWeights,
    floor: &FloorRules,
    has_data: bool,
) -> f64 {
    let weighted = weighted_score(scores, weights);
    let strong = scores.structural > floor.boost_trigger
        || scores.visual.is_some_and(|v| v > floor.boost_trigger);
    let adjusted = if weighted < floor.boost_below && strong {
        (weighted * floor.boost_factor).max(floor.boost_floor)
    } else if has_data {
        weighted.max(floor.data_floor)
    } else {
        weighted
    };
    adjusted.clamp(0.0, 1.0)
}
