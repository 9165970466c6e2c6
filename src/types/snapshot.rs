//! Captured page data: the style-annotated element tree and page assets.
//!
//! - [`ElementNode`] - one rendered element with its resolved style
//! - [`StyleSnapshot`] - geometry plus computed CSS values
//! - [`BreakpointCapture`] - one tree per viewport width
//! - [`PageSnapshot`] - metadata, all breakpoint captures and the [`AssetBundle`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::viewport::Breakpoint;

/// Four-sided box value in pixels (margin, padding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxSides {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoxSides {
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    pub fn is_linked(&self) -> bool {
        self.top == self.right && self.right == self.bottom && self.bottom == self.left
    }
}

/// Resolved geometry and computed styles for one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleSnapshot {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    pub display: String,
    pub position: String,
    pub float: String,
    pub visibility: String,
    pub overflow: String,
    pub opacity: f64,
    pub z_index: String,
    pub transform: String,

    pub flex_direction: String,
    pub flex_wrap: String,
    pub justify_content: String,
    pub align_items: String,
    pub gap: String,
    pub grid_template_columns: String,

    pub margin: BoxSides,
    pub padding: BoxSides,
    pub max_width: String,
    pub min_height: String,

    pub background_color: String,
    pub background_image: String,
    pub background_size: String,
    pub background_position: String,
    pub background_repeat: String,

    pub color: String,
    pub font_family: String,
    pub font_size: String,
    pub font_weight: String,
    pub font_style: String,
    pub line_height: String,
    pub letter_spacing: String,
    pub text_align: String,
    pub text_transform: String,
    pub text_decoration: String,

    pub border_width: String,
    pub border_style: String,
    pub border_color: String,
    pub border_radius: String,
    pub box_shadow: String,
}

impl StyleSnapshot {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_flex_or_grid(&self) -> bool {
        matches!(
            self.display.as_str(),
            "flex" | "inline-flex" | "grid" | "inline-grid"
        )
    }

    pub fn is_out_of_flow(&self) -> bool {
        matches!(self.position.as_str(), "absolute" | "fixed")
    }

    pub fn has_background_color(&self) -> bool {
        is_painted_color(&self.background_color)
    }

    pub fn has_background_image(&self) -> bool {
        let value = self.background_image.trim();
        !value.is_empty() && value != "none"
    }

    pub fn has_border(&self) -> bool {
        let style = self.border_style.trim();
        let width = parse_px(&self.border_width).unwrap_or(0.0);
        width > 0.0 && !style.is_empty() && style != "none" && style != "hidden"
    }

    pub fn has_radius(&self) -> bool {
        parse_px(&self.border_radius).unwrap_or(0.0) > 0.0
    }

    pub fn has_shadow(&self) -> bool {
        let value = self.box_shadow.trim();
        !value.is_empty() && value != "none"
    }
}

/// The "no paint" sentinels for colors.
pub fn is_painted_color(value: &str) -> bool {
    let v = value.trim();
    !(v.is_empty()
        || v == "none"
        || v == "transparent"
        || v.replace(' ', "") == "rgba(0,0,0,0)")
}

/// Leading numeric part of a CSS length such as `"16px"` or `"1.5"`.
pub fn parse_px(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let end = trimmed
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*c == '-' && *i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementNode {
    pub tag: String,
    pub id: String,
    pub class_name: String,
    /// Text owned directly by this element (not by descendants).
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub inner_html: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub outer_html: String,
    pub style: StyleSnapshot,
    pub children: Vec<ElementNode>,
    pub depth: usize,
    pub attributes: BTreeMap<String, String>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn has_markup(&self) -> bool {
        !self.inner_html.trim().is_empty() || !self.outer_html.trim().is_empty()
    }

    pub fn has_content(&self) -> bool {
        self.has_text() || self.has_markup()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Best available markup for opaque-markup widgets.
    pub fn markup(&self) -> &str {
        if !self.outer_html.trim().is_empty() {
            &self.outer_html
        } else {
            &self.inner_html
        }
    }

    /// Pre-order traversal with an explicit stack.
    pub fn iter(&self) -> ElementIter<'_> {
        ElementIter { stack: vec![self] }
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Text of this node and all descendants, whitespace-joined.
    pub fn text_content(&self) -> String {
        self.iter()
            .map(|n| n.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct ElementIter<'a> {
    stack: Vec<&'a ElementNode>,
}

impl<'a> Iterator for ElementIter<'a> {
    type Item = &'a ElementNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointCapture {
    pub breakpoint: Breakpoint,
    pub viewport_width: u32,
    pub root: ElementNode,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub favicon: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAsset {
    pub src: String,
    pub alt: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontFaceAsset {
    pub family: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoAsset {
    pub src: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormField {
    pub tag: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormAsset {
    pub action: String,
    pub method: String,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkAsset {
    pub href: String,
    pub text: String,
}

/// Page-level assets harvested once per scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetBundle {
    pub images: Vec<ImageAsset>,
    pub fonts: Vec<String>,
    pub font_faces: Vec<FontFaceAsset>,
    /// Ordered by usage frequency, most used first.
    pub colors: Vec<String>,
    pub gradients: Vec<String>,
    pub videos: Vec<VideoAsset>,
    pub forms: Vec<FormAsset>,
    pub buttons: Vec<LinkAsset>,
    pub links: Vec<LinkAsset>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
}

impl AssetBundle {
    pub fn total(&self) -> usize {
        self.images.len()
            + self.fonts.len()
            + self.font_faces.len()
            + self.colors.len()
            + self.gradients.len()
            + self.videos.len()
            + self.forms.len()
            + self.buttons.len()
            + self.links.len()
            + self.stylesheets.len()
            + self.scripts.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub metadata: PageMetadata,
    pub captures: Vec<BreakpointCapture>,
    #[serde(default)]
    pub assets: AssetBundle,
    /// Non-fatal capture problems (inaccessible stylesheets, failed harvests).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PageSnapshot {
    pub fn capture(&self, breakpoint: Breakpoint) -> Option<&BreakpointCapture> {
        self.captures.iter().find(|c| c.breakpoint == breakpoint)
    }

    /// The desktop tree is the structural source of truth; falls back to the
    /// widest capture available.
    pub fn primary(&self) -> Option<&BreakpointCapture> {
        self.capture(Breakpoint::Desktop)
            .or_else(|| self.captures.iter().max_by_key(|c| c.viewport_width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tag: &str, children: Vec<ElementNode>) -> ElementNode {
        ElementNode {
            tag: tag.to_string(),
            children,
            ..ElementNode::default()
        }
    }

    #[test]
    fn iter_is_preorder() {
        let tree = node(
            "body",
            vec![node("header", vec![node("h1", vec![])]), node("p", vec![])],
        );
        let tags: Vec<&str> = tree.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["body", "header", "h1", "p"]);
        assert_eq!(tree.count(), 4);
    }

    #[test]
    fn painted_color_sentinels() {
        assert!(!is_painted_color("rgba(0, 0, 0, 0)"));
        assert!(!is_painted_color("transparent"));
        assert!(!is_painted_color(""));
        assert!(is_painted_color("rgb(255, 0, 0)"));
        assert!(is_painted_color("rgba(0, 0, 0, 0.5)"));
    }

    #[test]
    fn parse_px_reads_leading_number() {
        assert_eq!(parse_px("16px"), Some(16.0));
        assert_eq!(parse_px("1.5"), Some(1.5));
        assert_eq!(parse_px("-4px"), Some(-4.0));
        assert_eq!(parse_px("normal"), None);
    }

    #[test]
    fn snapshot_deserializes_with_missing_style_fields() {
        let raw = r#"{
            "url": "https://example.com",
            "captures": [{
                "breakpoint": "desktop",
                "viewportWidth": 1200,
                "root": {"tag": "body", "style": {"width": 1200, "display": "block"}}
            }]
        }"#;
        let snap: PageSnapshot = serde_json::from_str(raw).expect("parse snapshot");
        let primary = snap.primary().expect("desktop capture");
        assert_eq!(primary.root.style.width, 1200.0);
        assert!(primary.root.style.margin.is_zero());
        assert_eq!(snap.assets.total(), 0);
    }
}
