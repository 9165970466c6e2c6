//! Column synthesis for one section: which children share a column, and how
//! wide each column is.

use super::rules::{is_landmark, is_widget_tag, paints_background, Role, RuleChain};
use crate::config::ClassifierConfig;
use crate::types::{ElementNode, Widget};

/// Where a column's widgets come from.
#[derive(Debug)]
pub enum ColumnSource<'a> {
    /// A child that is a column in its own right.
    Node(&'a ElementNode),
    /// Consecutive widget-like children grouped together.
    Loose(Vec<&'a ElementNode>),
}

/// The node whose children are the section's columns, skipping plain
/// single-child wrappers such as `.container > .row`.
pub fn layout_parent(section: &ElementNode) -> &ElementNode {
    let mut current = section;
    while let [only] = current.children.as_slice() {
        if only.is_leaf() || only.has_text() || is_widget_tag(only) || paints_background(only) {
            break;
        }
        current = only;
    }
    current
}

/// Whether `child` must open a new column instead of joining the one that
/// holds `previous`.
pub fn starts_new_column(
    previous: &ElementNode,
    child: &ElementNode,
    parent: &ElementNode,
    average_width: f64,
    config: &ClassifierConfig,
) -> bool {
    if child.style.is_out_of_flow() || is_landmark(child) {
        return true;
    }
    if average_width > 0.0 && child.style.width > average_width * config.column_break_width_ratio {
        return true;
    }
    parent.style.is_flex_or_grid() && child.style.y > previous.style.bottom()
}

/// Split the children of `parent` into column sources, in document order.
pub fn group_children<'a>(
    parent: &'a ElementNode,
    chain: &RuleChain,
    config: &ClassifierConfig,
) -> Vec<ColumnSource<'a>> {
    let widths: Vec<f64> = parent
        .children
        .iter()
        .map(|c| c.style.width)
        .filter(|w| *w > 0.0)
        .collect();
    let average_width = if widths.is_empty() {
        0.0
    } else {
        widths.iter().sum::<f64>() / widths.len() as f64
    };

    let mut sources = Vec::new();
    let mut loose: Vec<&ElementNode> = Vec::new();
    for child in &parent.children {
        match chain.classify(child, config).role {
            Role::Column | Role::Section | Role::Descend => {
                if !loose.is_empty() {
                    sources.push(ColumnSource::Loose(std::mem::take(&mut loose)));
                }
                sources.push(ColumnSource::Node(child));
            }
            Role::Widget => {
                if let Some(previous) = loose.last() {
                    if starts_new_column(previous, child, parent, average_width, config) {
                        sources.push(ColumnSource::Loose(std::mem::take(&mut loose)));
                    }
                }
                loose.push(child);
            }
        }
    }
    if !loose.is_empty() {
        sources.push(ColumnSource::Loose(loose));
    }
    sources
}

/// Base weight, plus per-widget, media and form bonuses.
pub fn column_weight(widgets: &[Widget], config: &ClassifierConfig) -> f64 {
    let mut weight = config.column_base_weight + config.widget_weight * widgets.len() as f64;
    if widgets.iter().any(|w| w.widget_type.is_media()) {
        weight += config.media_weight;
    }
    if widgets.iter().any(|w| w.widget_type.is_form_like()) {
        weight += config.form_weight;
    }
    weight
}

/// Integer widths proportional to `weights`, clamped to `[min, max]` and
/// summing to exactly 100.
///
/// When `n` columns cannot all fit the bounds, they widen to
/// `[min(min, 100/n), max(max, 100/n)]`. Clamped columns are fixed and the
/// remaining space is shared among the rest by weight; the last column takes
/// the rounding remainder.
pub fn allocate_widths(weights: &[f64], min: f64, max: f64) -> Vec<u32> {
    let n = weights.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![100],
        _ => {}
    }
    let even = 100.0 / n as f64;
    let lo = min.min(even);
    let hi = max.max(even);

    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    let shares: Vec<f64> = if total > 0.0 {
        weights.iter().map(|w| w.max(0.0) / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    };

    let mut widths: Vec<f64> = shares.iter().map(|s| s * 100.0).collect();
    let mut fixed = vec![false; n];
    for _ in 0..n {
        let mut changed = false;
        for i in 0..n {
            if fixed[i] {
                continue;
            }
            if widths[i] < lo {
                widths[i] = lo;
                fixed[i] = true;
                changed = true;
            } else if widths[i] > hi {
                widths[i] = hi;
                fixed[i] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
        let used: f64 = (0..n).filter(|&i| fixed[i]).map(|i| widths[i]).sum();
        let free_share: f64 = (0..n).filter(|&i| !fixed[i]).map(|i| shares[i]).sum();
        if free_share <= 0.0 {
            break;
        }
        for i in (0..n).filter(|&i| !fixed[i]) {
            widths[i] = shares[i] / free_share * (100.0 - used);
        }
    }

    // Floor the running total so no column drifts by more than one unit.
    let mut sizes = Vec::with_capacity(n);
    let mut running = 0.0;
    let mut assigned = 0u32;
    for width in &widths[..n - 1] {
        running += width;
        let edge = ((running + 1e-9).floor() as u32).min(100);
        sizes.push(edge.saturating_sub(assigned));
        assigned = assigned.max(edge);
    }
    sizes.push(100u32.saturating_sub(assigned));
    sizes
}
