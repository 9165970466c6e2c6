//! Standalone HTML rendering of a [`TemplateDocument`], used to load the
//! clone into a browser page for comparison.

use std::fmt::Write as _;

use serde_json::Value;

use crate::types::{Settings, TemplateDocument, Widget, WidgetType};

const BASE_CSS: &str = "*{box-sizing:border-box}body{margin:0}\
.pcl-row{display:flex;flex-wrap:wrap;width:100%}\
.pcl-column{display:flex;flex-direction:column;min-width:0}\
.pcl-button{display:inline-block;text-decoration:none}\
.pcl-menu{display:flex;gap:16px;list-style:none;margin:0;padding:0}\
.pcl-menu.vertical{flex-direction:column}\
img{max-width:100%;height:auto}";

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn str_setting<'a>(settings: &'a Settings, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn dimension_css(value: &Value, property: &str) -> Option<String> {
    let unit = value.get("unit").and_then(Value::as_str).unwrap_or("px");
    let side = |name: &str| -> String {
        match value.get(name) {
            Some(Value::String(s)) if !s.is_empty() => format!("{s}{unit}"),
            Some(Value::Number(n)) => format!("{n}{unit}"),
            _ => format!("0{unit}"),
        }
    };
    value.is_object().then(|| {
        format!(
            "{property}:{} {} {} {};",
            side("top"),
            side("right"),
            side("bottom"),
            side("left")
        )
    })
}

fn size_css(value: &Value, property: &str) -> Option<String> {
    let size = value.get("size").and_then(Value::as_f64)?;
    let unit = value.get("unit").and_then(Value::as_str).unwrap_or("px");
    Some(format!("{property}:{size}{unit};"))
}

/// Inline CSS for box settings stored under `prefix` (`""` for sections
/// and columns, `"_"` for widgets).
fn box_css(settings: &Settings, prefix: &str) -> String {
    let key = |name: &str| format!("{prefix}{name}");
    let mut css = String::new();
    if let Some(color) = str_setting(settings, &key("background_color")) {
        let _ = write!(css, "background-color:{color};");
    }
    if let Some(url) = settings
        .get(&key("background_image"))
        .and_then(|v| v.get("url"))
        .and_then(Value::as_str)
    {
        let _ = write!(css, "background-image:url('{}');", escape_html(url));
        for (name, property) in [
            ("background_size", "background-size"),
            ("background_position", "background-position"),
            ("background_repeat", "background-repeat"),
        ] {
            if let Some(value) = str_setting(settings, &key(name)) {
                let _ = write!(css, "{property}:{value};");
            }
        }
    }
    if let Some(gradient) = str_setting(settings, &key("background_gradient_css")) {
        let _ = write!(css, "background-image:{gradient};");
    }
    for (name, property) in [("margin", "margin"), ("padding", "padding")] {
        if let Some(rule) = settings.get(&key(name)).and_then(|v| dimension_css(v, property)) {
            css.push_str(&rule);
        }
    }
    if let Some(rule) = settings
        .get(&key("border_radius"))
        .and_then(|v| dimension_css(v, "border-radius"))
    {
        css.push_str(&rule);
    }
    if let Some(style) = str_setting(settings, &key("border_border")) {
        let _ = write!(css, "border-style:{style};");
        if let Some(rule) = settings
            .get(&key("border_width"))
            .and_then(|v| dimension_css(v, "border-width"))
        {
            css.push_str(&rule);
        }
        if let Some(color) = str_setting(settings, &key("border_color")) {
            let _ = write!(css, "border-color:{color};");
        }
    }
    if let Some(shadow) = str_setting(settings, &key("box_shadow_css")) {
        let _ = write!(css, "box-shadow:{shadow};");
    }
    css
}

fn typography_css(settings: &Settings, color_key: &str) -> String {
    let mut css = String::new();
    if let Some(family) = str_setting(settings, "typography_font_family") {
        let _ = write!(css, "font-family:'{family}';");
    }
    for (name, property) in [
        ("typography_font_size", "font-size"),
        ("typography_line_height", "line-height"),
        ("typography_letter_spacing", "letter-spacing"),
    ] {
        if let Some(rule) = settings.get(name).and_then(|v| size_css(v, property)) {
            css.push_str(&rule);
        }
    }
    for (name, property) in [
        ("typography_font_weight", "font-weight"),
        ("typography_font_style", "font-style"),
        ("typography_text_transform", "text-transform"),
        ("align", "text-align"),
    ] {
        if let Some(value) = str_setting(settings, name) {
            let _ = write!(css, "{property}:{value};");
        }
    }
    if let Some(color) = str_setting(settings, color_key) {
        let _ = write!(css, "color:{color};");
    }
    css
}

fn style_attr(css: &str) -> String {
    if css.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", css.replace('"', "'"))
    }
}

fn render_widget(widget: &Widget, out: &mut String) {
    let s = &widget.settings;
    let element_id = str_setting(s, "_element_id").unwrap_or(&widget.id);
    let wrapper_css = box_css(s, "_");
    let _ = write!(
        out,
        "<div class=\"pcl-widget pcl-{}\" id=\"{}\"{}>",
        widget.widget_type,
        escape_html(element_id),
        style_attr(&wrapper_css)
    );
    match widget.widget_type {
        WidgetType::Heading => {
            let level = str_setting(s, "header_size")
                .filter(|l| matches!(*l, "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
                .unwrap_or("h2");
            let css = typography_css(s, "title_color");
            let title = str_setting(s, "title").unwrap_or_default();
            let _ = write!(out, "<{level}{}>{title}</{level}>", style_attr(&css));
        }
        WidgetType::Text => {
            let css = typography_css(s, "text_color");
            let editor = str_setting(s, "editor").unwrap_or_default();
            let _ = write!(out, "<div{}>{editor}</div>", style_attr(&css));
        }
        WidgetType::Image => {
            let image = s.get("image");
            let url = image.and_then(|i| i.get("url")).and_then(Value::as_str).unwrap_or_default();
            let alt = image.and_then(|i| i.get("alt")).and_then(Value::as_str).unwrap_or_default();
            let mut css = String::new();
            if let Some(rule) = s.get("width").and_then(|v| size_css(v, "width")) {
                css.push_str(&rule);
            }
            let img = format!(
                "<img src=\"{}\" alt=\"{}\"{}>",
                escape_html(url),
                escape_html(alt),
                style_attr(&css)
            );
            match s.get("link").and_then(|l| l.get("url")).and_then(Value::as_str) {
                Some(href) => {
                    let _ = write!(out, "<a href=\"{}\">{img}</a>", escape_html(href));
                }
                None => out.push_str(&img),
            }
        }
        WidgetType::Button => {
            let mut css = typography_css(s, "button_text_color");
            if let Some(color) = str_setting(s, "background_color") {
                let _ = write!(css, "background-color:{color};");
            }
            if let Some(rule) = s.get("text_padding").and_then(|v| dimension_css(v, "padding")) {
                css.push_str(&rule);
            }
            if let Some(radius) = str_setting(s, "border_radius") {
                let _ = write!(css, "border-radius:{radius};");
            }
            let href = s
                .get("link")
                .and_then(|l| l.get("url"))
                .and_then(Value::as_str)
                .unwrap_or("#");
            let text = str_setting(s, "text").unwrap_or("Button");
            let _ = write!(
                out,
                "<a class=\"pcl-button\" href=\"{}\"{}>{}</a>",
                escape_html(href),
                style_attr(&css),
                escape_html(text)
            );
        }
        WidgetType::Video => {
            let provider = str_setting(s, "video_type").unwrap_or("youtube");
            let url = str_setting(s, &format!("{provider}_url")).unwrap_or_default();
            let _ = write!(
                out,
                "<iframe src=\"{}\" width=\"100%\" height=\"360\" frameborder=\"0\" allowfullscreen></iframe>",
                escape_html(url)
            );
        }
        WidgetType::Form => out.push_str(str_setting(s, "form_html").unwrap_or_default()),
        WidgetType::Html => out.push_str(str_setting(s, "html").unwrap_or_default()),
        WidgetType::NavMenu => {
            let vertical = str_setting(s, "layout") == Some("vertical");
            let css = typography_css(s, "color_menu_item");
            let _ = write!(
                out,
                "<nav><ul class=\"pcl-menu{}\"{}>",
                if vertical { " vertical" } else { "" },
                style_attr(&css)
            );
            for item in s
                .get("menu_items")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                let text = item.get("text").and_then(Value::as_str).unwrap_or_default();
                let url = item.get("url").and_then(Value::as_str).unwrap_or("#");
                let _ = write!(
                    out,
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(url),
                    escape_html(text)
                );
            }
            out.push_str("</ul></nav>");
        }
        WidgetType::Spacer => {
            let height = s
                .get("space")
                .and_then(|v| v.get("size"))
                .and_then(Value::as_f64)
                .unwrap_or(50.0);
            let _ = write!(out, "<div style=\"height:{height}px\"></div>");
        }
    }
    out.push_str("</div>");
}

/// Render `doc` as a complete HTML page: one flex row per section and
/// percentage-width columns.
pub fn render_html(doc: &TemplateDocument) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{}</title><style>{BASE_CSS}{}</style></head><body>",
        escape_html(&doc.title),
        doc.page_settings.custom_css.replace("</style", "<\\/style")
    );
    for section in &doc.content {
        let tag = str_setting(&section.settings, "html_tag")
            .filter(|t| matches!(*t, "section" | "header" | "footer" | "main" | "article" | "nav" | "aside"))
            .unwrap_or("section");
        let _ = write!(
            out,
            "<{tag} class=\"pcl-section\" data-id=\"{}\"{}><div class=\"pcl-row\">",
            section.id,
            style_attr(&box_css(&section.settings, ""))
        );
        for column in &section.elements {
            let width = column.size().unwrap_or(100.0);
            let css = format!("width:{width}%;{}", box_css(&column.settings, ""));
            let _ = write!(
                out,
                "<div class=\"pcl-column\" data-id=\"{}\"{}>",
                column.id,
                style_attr(&css)
            );
            for widget in &column.elements {
                render_widget(widget, &mut out);
            }
            out.push_str("</div>");
        }
        let _ = write!(out, "</div></{tag}>");
    }
    out.push_str("</body></html>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Column, DocumentMetadata, ElType, PageSettings, Section, TEMPLATE_VERSION,
    };
    use serde_json::json;

    fn widget(kind: WidgetType, settings: Value) -> Widget {
        Widget {
            id: "wIdgEt01".to_string(),
            el_type: ElType::Widget,
            widget_type: kind,
            settings: settings.as_object().cloned().unwrap_or_default(),
        }
    }

    fn doc(widgets: Vec<Widget>) -> TemplateDocument {
        TemplateDocument {
            version: TEMPLATE_VERSION.to_string(),
            title: "A & B".to_string(),
            doc_type: "page".to_string(),
            content: vec![Section {
                id: "sEction01".to_string(),
                el_type: ElType::Section,
                settings: json!({"html_tag": "header", "background_color": "rgb(1, 2, 3)"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                elements: vec![Column {
                    id: "cOlumn01".to_string(),
                    el_type: ElType::Column,
                    settings: json!({"_column_size": 50}).as_object().cloned().unwrap_or_default(),
                    elements: widgets,
                }],
            }],
            page_settings: PageSettings {
                template: "elementor_canvas".to_string(),
                viewport_mobile: 375,
                viewport_tablet: 768,
                custom_css: ".x{color:red}".to_string(),
                custom_colors: vec![],
                custom_fonts: vec![],
            },
            metadata: DocumentMetadata {
                created_at: String::new(),
                source_url: String::new(),
                fidelity_score: None,
                total_elements: 0,
                sections_count: 1,
                columns_count: 1,
                widgets_count: 0,
            },
        }
    }

    #[test]
    fn renders_layout_skeleton() {
        let html = render_html(&doc(vec![]));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains(".x{color:red}"));
        assert!(html.contains("<header class=\"pcl-section\""));
        assert!(html.contains("background-color:rgb(1, 2, 3);"));
        assert!(html.contains("width:50%;"));
    }

    #[test]
    fn renders_each_widget_kind() {
        let html = render_html(&doc(vec![
            widget(WidgetType::Heading, json!({"title": "Hello", "header_size": "h1"})),
            widget(WidgetType::Text, json!({"editor": "<p>World</p>"})),
            widget(WidgetType::Image, json!({"image": {"url": "/a.png", "alt": "A"}})),
            widget(WidgetType::Button, json!({"text": "Go", "link": {"url": "/go"}})),
            widget(
                WidgetType::NavMenu,
                json!({"menu_items": [{"text": "Home", "url": "/"}]}),
            ),
            widget(WidgetType::Spacer, json!({"space": {"unit": "px", "size": 40.0}})),
        ]));
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>World</p>"));
        assert!(html.contains("<img src=\"/a.png\" alt=\"A\">"));
        assert!(html.contains("<a class=\"pcl-button\" href=\"/go\">Go</a>"));
        assert!(html.contains("<li><a href=\"/\">Home</a></li>"));
        assert!(html.contains("height:40px"));
    }

    #[test]
    fn widget_margins_render_from_prefixed_keys() {
        let html = render_html(&doc(vec![widget(
            WidgetType::Text,
            json!({"editor": "x", "_margin": {"unit": "px", "top": "4", "right": "0", "bottom": "4", "left": "0"}}),
        )]));
        assert!(html.contains("margin:4px 0px 4px 0px;"));
    }
}
