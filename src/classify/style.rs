//! Computed style to builder settings.
//!
//! Shared by sections, columns and widgets. A value is only written when it
//! differs from what the builder would render anyway, so unpainted
//! backgrounds, zero spacing and default typography leave no trace.

use serde_json::{json, Value};

use crate::capture::assets::{extract_css_urls, first_font_family, is_generic_family};
use crate::types::snapshot::{is_painted_color, parse_px};
use crate::types::{BoxSides, Settings, StyleSnapshot};

/// CSS-style number: integers without a fraction, others to two places.
pub fn css_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Four sides plus unit, the builder's dimension shape.
pub fn spacing(sides: &BoxSides) -> Value {
    json!({
        "unit": "px",
        "top": css_number(sides.top),
        "right": css_number(sides.right),
        "bottom": css_number(sides.bottom),
        "left": css_number(sides.left),
        "isLinked": sides.is_linked(),
    })
}

fn uniform(value: f64) -> Value {
    spacing(&BoxSides {
        top: value,
        right: value,
        bottom: value,
        left: value,
    })
}

fn slider(value: f64, unit: &str) -> Value {
    json!({ "unit": unit, "size": value })
}

/// Background, spacing, border, radius and shadow.
pub fn apply_box_style(settings: &mut Settings, style: &StyleSnapshot) {
    if style.has_background_color() {
        settings.insert("background_background".into(), json!("classic"));
        settings.insert("background_color".into(), json!(style.background_color.trim()));
    }
    if style.has_background_image() {
        let image = style.background_image.trim();
        if image.contains("gradient(") {
            settings.insert("background_background".into(), json!("gradient"));
            settings.insert("background_gradient_css".into(), json!(image));
        } else if let Some(url) = extract_css_urls(image).into_iter().next() {
            settings.insert("background_background".into(), json!("classic"));
            settings.insert("background_image".into(), json!({ "url": url, "id": "" }));
            for (key, value) in [
                ("background_size", &style.background_size),
                ("background_position", &style.background_position),
                ("background_repeat", &style.background_repeat),
            ] {
                if !value.trim().is_empty() {
                    settings.insert(key.into(), json!(value.trim()));
                }
            }
        }
    }

    if !style.margin.is_zero() {
        settings.insert("margin".into(), spacing(&style.margin));
    }
    if !style.padding.is_zero() {
        settings.insert("padding".into(), spacing(&style.padding));
    }

    if style.has_border() {
        let width = parse_px(&style.border_width).unwrap_or(0.0);
        settings.insert("border_border".into(), json!(style.border_style.trim()));
        settings.insert("border_width".into(), uniform(width));
        if is_painted_color(&style.border_color) {
            settings.insert("border_color".into(), json!(style.border_color.trim()));
        }
    }
    if style.has_radius() {
        let radius = parse_px(&style.border_radius).unwrap_or(0.0);
        settings.insert("border_radius".into(), uniform(radius));
    }
    if style.has_shadow() {
        settings.insert("box_shadow_box_shadow_type".into(), json!("yes"));
        settings.insert("box_shadow_css".into(), json!(style.box_shadow.trim()));
    }
}

/// Typography group plus text color under `color_key`.
pub fn apply_typography(settings: &mut Settings, style: &StyleSnapshot, color_key: &str) {
    let mut custom = false;

    if let Some(family) = first_font_family(&style.font_family) {
        if !is_generic_family(&family) {
            settings.insert("typography_font_family".into(), json!(family));
            custom = true;
        }
    }
    if let Some(size) = parse_px(&style.font_size).filter(|s| *s > 0.0) {
        settings.insert("typography_font_size".into(), slider(size, "px"));
        custom = true;
    }
    let weight = style.font_weight.trim();
    if !weight.is_empty() && weight != "400" && weight != "normal" {
        settings.insert("typography_font_weight".into(), json!(weight));
        custom = true;
    }
    if style.font_style.trim() == "italic" {
        settings.insert("typography_font_style".into(), json!("italic"));
        custom = true;
    }
    let line_height = style.line_height.trim();
    if line_height.ends_with("px") {
        if let Some(value) = parse_px(line_height) {
            settings.insert("typography_line_height".into(), slider(value, "px"));
            custom = true;
        }
    }
    if let Some(spacing) = parse_px(&style.letter_spacing).filter(|s| *s != 0.0) {
        settings.insert("typography_letter_spacing".into(), slider(spacing, "px"));
        custom = true;
    }
    let transform = style.text_transform.trim();
    if !transform.is_empty() && transform != "none" {
        settings.insert("typography_text_transform".into(), json!(transform));
        custom = true;
    }
    if custom {
        settings.insert("typography_typography".into(), json!("custom"));
    }

    match style.text_align.trim() {
        "center" => {
            settings.insert("align".into(), json!("center"));
        }
        "right" | "end" => {
            settings.insert("align".into(), json!("right"));
        }
        "justify" => {
            settings.insert("align".into(), json!("justify"));
        }
        _ => {}
    }

    if is_painted_color(&style.color) {
        settings.insert(color_key.into(), json!(style.color.trim()));
    }
}
