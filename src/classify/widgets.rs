//! Widget materialization: one captured element to one builder widget.
//!
//! Dispatch is by tag. Anything without a dedicated handler becomes a text
//! or opaque-markup widget when it carries content, a spacer when it only
//! paints, and is dropped otherwise.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};

use super::ids::IdGenerator;
use super::rules::paints_background;
use super::style::{apply_box_style, apply_typography, spacing};
use crate::types::snapshot::is_painted_color;
use crate::types::{ElType, ElementNode, Settings, Widget, WidgetType};
use crate::verify::render::escape_html;

const TEXT_TAGS: &[&str] = &[
    "p", "span", "label", "strong", "em", "b", "i", "small", "code", "blockquote", "pre",
    "figcaption", "li", "dd", "dt",
];

const SUBMIT_INPUT_TYPES: &[&str] = &["submit", "button", "image", "reset"];

fn button_class_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(^|[\s_-])(btn|button|cta)([\s_-]|$)").expect("button class regex is valid")
    })
}

/// A link styled as a button: button-ish class name, or visible paint
/// (background, border or radius) together with padding.
pub fn is_button_like(node: &ElementNode) -> bool {
    if button_class_regex().is_match(&node.class_name) {
        return true;
    }
    let style = &node.style;
    let painted = style.has_background_color() || style.has_border() || style.has_radius();
    painted && !style.padding.is_zero()
}

/// `youtube` or `vimeo` for embeddable video URLs.
pub fn video_provider(url: &str) -> Option<&'static str> {
    let lower = url.to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") || lower.contains("youtube-nocookie.com") {
        Some("youtube")
    } else if lower.contains("vimeo.com") {
        Some("vimeo")
    } else {
        None
    }
}

fn inner_or_text(node: &ElementNode) -> String {
    if node.inner_html.trim().is_empty() {
        node.text_content()
    } else {
        node.inner_html.trim().to_string()
    }
}

fn image_source(node: &ElementNode) -> Option<&str> {
    node.iter()
        .filter(|n| n.tag == "img" || n.tag == "source")
        .find_map(|n| {
            n.attr("data-src")
                .or_else(|| n.attr("data-lazy-src"))
                .or_else(|| n.attr("src"))
                .filter(|s| !s.starts_with("data:"))
        })
}

fn media_source(node: &ElementNode) -> Option<&str> {
    node.attr("src").or_else(|| {
        node.children
            .iter()
            .filter(|c| c.tag == "source")
            .find_map(|c| c.attr("src"))
    })
}

fn link_value(url: &str) -> Value {
    json!({ "url": url, "is_external": "", "nofollow": "" })
}

struct WidgetBuilder<'a> {
    node: &'a ElementNode,
    widget_type: WidgetType,
    settings: Settings,
}

impl<'a> WidgetBuilder<'a> {
    fn new(node: &'a ElementNode, widget_type: WidgetType) -> Self {
        Self {
            node,
            widget_type,
            settings: Settings::new(),
        }
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    fn typography(mut self, color_key: &str) -> Self {
        apply_typography(&mut self.settings, &self.node.style, color_key);
        self
    }

    /// Box styles live under the builder's underscore-prefixed advanced keys.
    fn boxed(mut self) -> Self {
        let mut box_settings = Settings::new();
        apply_box_style(&mut box_settings, &self.node.style);
        for (key, value) in box_settings {
            self.settings.insert(format!("_{key}"), value);
        }
        self
    }

    fn build(mut self, ids: &mut IdGenerator) -> Widget {
        let id = ids.next_id();
        let element_id = if self.node.id.trim().is_empty() {
            id.clone()
        } else {
            self.node.id.trim().to_string()
        };
        self.settings.insert("_element_id".to_string(), json!(element_id));
        Widget {
            id,
            el_type: ElType::Widget,
            widget_type: self.widget_type,
            settings: self.settings,
        }
    }
}

fn heading(node: &ElementNode) -> WidgetBuilder<'_> {
    WidgetBuilder::new(node, WidgetType::Heading)
        .set("title", json!(inner_or_text(node)))
        .set("header_size", json!(node.tag))
        .typography("title_color")
        .boxed()
}

fn text(node: &ElementNode, editor: String) -> WidgetBuilder<'_> {
    WidgetBuilder::new(node, WidgetType::Text)
        .set("editor", json!(editor))
        .typography("text_color")
        .boxed()
}

fn html<'a>(node: &'a ElementNode, markup: &str) -> WidgetBuilder<'a> {
    WidgetBuilder::new(node, WidgetType::Html).set("html", json!(markup))
}

fn image<'a>(node: &'a ElementNode, src: &str) -> WidgetBuilder<'a> {
    let alt = node
        .iter()
        .find_map(|n| n.attr("alt"))
        .unwrap_or_default()
        .to_string();
    let mut builder = WidgetBuilder::new(node, WidgetType::Image)
        .set("image", json!({ "url": src, "id": "", "alt": alt }))
        .set("image_size", json!("full"));
    if node.style.width > 0.0 {
        builder = builder.set("width", json!({ "unit": "px", "size": node.style.width.round() }));
    }
    if node.style.height > 0.0 {
        builder = builder.set("height", json!({ "unit": "px", "size": node.style.height.round() }));
    }
    builder.boxed()
}

fn button<'a>(node: &'a ElementNode, label: String, href: Option<&str>) -> WidgetBuilder<'a> {
    let mut builder = WidgetBuilder::new(node, WidgetType::Button)
        .set("text", json!(label))
        .typography("button_text_color");
    if let Some(href) = href {
        builder = builder.set("link", link_value(href));
    }
    let style = &node.style;
    if is_painted_color(&style.background_color) {
        builder = builder
            .set("background_background", json!("classic"))
            .set("background_color", json!(style.background_color.trim()));
    }
    if !style.padding.is_zero() {
        builder = builder.set("text_padding", spacing(&style.padding));
    }
    if style.has_radius() {
        builder = builder.set("border_radius", json!(style.border_radius.trim()));
    }
    builder
}

fn anchor(node: &ElementNode) -> Option<WidgetBuilder<'_>> {
    let href = node.attr("href");
    let label = node.text_content();
    if label.is_empty() {
        if let Some(src) = image_source(node) {
            let mut builder = image(node, src);
            if let Some(href) = href {
                builder = builder
                    .set("link_to", json!("custom"))
                    .set("link", link_value(href));
            }
            return Some(builder);
        }
        return None;
    }
    if is_button_like(node) {
        return Some(button(node, label, href));
    }
    let editor = match href {
        Some(href) => format!("<a href=\"{}\">{}</a>", escape_html(href), inner_or_text(node)),
        None => inner_or_text(node),
    };
    let mut builder = text(node, editor);
    if let Some(href) = href {
        builder = builder.set("link", link_value(href));
    }
    Some(builder)
}

fn list(node: &ElementNode) -> WidgetBuilder<'_> {
    let items: String = node
        .children
        .iter()
        .filter(|c| c.tag == "li")
        .map(|li| format!("<li>{}</li>", inner_or_text(li)))
        .collect();
    let body = if items.is_empty() {
        inner_or_text(node)
    } else {
        items
    };
    text(node, format!("<{tag}>{body}</{tag}>", tag = node.tag))
}

fn nav_menu(node: &ElementNode) -> Option<WidgetBuilder<'_>> {
    let items: Vec<Value> = node
        .iter()
        .filter(|n| n.tag == "a")
        .filter_map(|a| {
            let label = a.text_content();
            (!label.is_empty()).then(|| json!({ "text": label, "url": a.attr("href").unwrap_or("#") }))
        })
        .collect();
    if items.is_empty() {
        return node.has_content().then(|| html(node, node.markup()));
    }
    let layout = if node.style.flex_direction.starts_with("column") {
        "vertical"
    } else {
        "horizontal"
    };
    Some(
        WidgetBuilder::new(node, WidgetType::NavMenu)
            .set("menu_items", Value::Array(items))
            .set("layout", json!(layout))
            .typography("color_menu_item")
            .boxed(),
    )
}

fn video_or_markup(node: &ElementNode) -> Option<WidgetBuilder<'_>> {
    if let Some(src) = media_source(node) {
        if let Some(provider) = video_provider(src) {
            return Some(
                WidgetBuilder::new(node, WidgetType::Video)
                    .set("video_type", json!(provider))
                    .set(&format!("{provider}_url"), json!(src)),
            );
        }
    }
    let markup = node.markup();
    (!markup.trim().is_empty()).then(|| html(node, markup))
}

fn input(node: &ElementNode) -> WidgetBuilder<'_> {
    let kind = node.attr("type").unwrap_or("text").to_ascii_lowercase();
    if SUBMIT_INPUT_TYPES.contains(&kind.as_str()) {
        let label = node.attr("value").unwrap_or("Submit").to_string();
        button(node, label, None)
    } else {
        html(node, node.markup())
    }
}

fn form(node: &ElementNode) -> WidgetBuilder<'_> {
    let name = node
        .attr("name")
        .or_else(|| node.attr("aria-label"))
        .or_else(|| node.attr("id"))
        .unwrap_or("Form");
    WidgetBuilder::new(node, WidgetType::Form)
        .set("form_name", json!(name))
        .set("form_html", json!(node.markup()))
        .boxed()
}

fn fallback(node: &ElementNode) -> Option<WidgetBuilder<'_>> {
    if node.has_text() {
        let body = inner_or_text(node);
        let editor = if node.inner_html.trim().is_empty() {
            format!("<p>{body}</p>")
        } else {
            body
        };
        return Some(text(node, editor));
    }
    if node.has_markup() {
        return Some(html(node, node.markup()));
    }
    if paints_background(node) && node.style.height > 0.0 {
        return Some(
            WidgetBuilder::new(node, WidgetType::Spacer)
                .set("space", json!({ "unit": "px", "size": node.style.height.round() }))
                .boxed(),
        );
    }
    None
}

/// Materialize `node` as a widget; `None` when it has nothing to show.
pub fn create_widget(node: &ElementNode, ids: &mut IdGenerator) -> Option<Widget> {
    let tag = node.tag.as_str();
    let builder = match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(heading(node)),
        "img" | "picture" => image_source(node).map(|src| image(node, src)),
        "a" => anchor(node),
        "button" => {
            let label = node.text_content();
            Some(button(node, if label.is_empty() { "Button".to_string() } else { label }, None))
        }
        "form" => Some(form(node)),
        "input" => Some(input(node)),
        "textarea" | "select" | "table" | "thead" | "tbody" | "tr" | "td" | "th" | "svg" => {
            let markup = node.markup();
            (!markup.trim().is_empty()).then(|| html(node, markup))
        }
        "video" | "iframe" => video_or_markup(node),
        "ul" | "ol" => Some(list(node)),
        "nav" | "menu" => nav_menu(node),
        _ if TEXT_TAGS.contains(&tag) => {
            let body = inner_or_text(node);
            if body.is_empty() {
                None
            } else {
                Some(text(node, format!("<{tag}>{body}</{tag}>")))
            }
        }
        _ => fallback(node),
    };
    builder.map(|b| b.build(ids))
}

/// Placeholder content for pages that yield no sections at all.
pub fn welcome_widget(ids: &mut IdGenerator) -> Widget {
    let node = ElementNode::new("h2");
    WidgetBuilder::new(&node, WidgetType::Heading)
        .set("title", json!("Welcome to your cloned page"))
        .set("header_size", json!("h2"))
        .build(ids)
}

/// Empty widget keeping a painted section visible.
pub fn spacer_widget(height: f64, ids: &mut IdGenerator) -> Widget {
    let node = ElementNode::new("div");
    WidgetBuilder::new(&node, WidgetType::Spacer)
        .set("space", json!({ "unit": "px", "size": height.max(0.0).round() }))
        .build(ids)
}
