//! Page palette: the few colors and fonts a page is built from.

use palette::{convert::FromColorUnclamped, Lab, Srgb};

use super::ids::IdGenerator;
use crate::capture::assets::{first_font_family, is_generic_family};
use crate::types::snapshot::is_painted_color;
use crate::types::{CustomColor, CustomFont};

const SLOT_TITLES: [&str; 4] = ["Primary", "Secondary", "Text", "Accent"];

fn slot_title(index: usize, kind: &str) -> String {
    SLOT_TITLES
        .get(index)
        .map(|t| t.to_string())
        .unwrap_or_else(|| format!("Custom {kind} {}", index - SLOT_TITLES.len() + 1))
}

/// `rgb()`, `rgba()` and `#hex` to RGB bytes. Fully transparent values and
/// anything unparseable give `None`.
pub fn parse_css_color(value: &str) -> Option<[u8; 3]> {
    let v = value.trim().to_ascii_lowercase();
    if !is_painted_color(&v) {
        return None;
    }
    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }
    let body = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    if let Some(alpha) = parts.get(3) {
        let alpha = match alpha.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => alpha.parse::<f32>().ok()?,
        };
        if alpha <= 0.0 {
            return None;
        }
    }
    let channel = |s: &str| -> Option<u8> {
        let n = s.parse::<f32>().ok()?;
        Some(n.clamp(0.0, 255.0).round() as u8)
    };
    Some([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?])
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let byte = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    if expanded.len() == 8 && byte(6)? == 0 {
        return None;
    }
    Some([byte(0)?, byte(2)?, byte(4)?])
}

fn to_lab(rgb: [u8; 3]) -> Lab {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    Lab::from_color_unclamped(srgb)
}

fn lab_distance(a: Lab, b: Lab) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Colors in rank order, merging near-duplicates, capped at `limit`.
pub fn derive_colors(
    ranked: &[String],
    limit: usize,
    merge_distance: f32,
    ids: &mut IdGenerator,
) -> Vec<CustomColor> {
    let mut kept: Vec<(Lab, [u8; 3])> = Vec::new();
    for value in ranked {
        if kept.len() >= limit {
            break;
        }
        let Some(rgb) = parse_css_color(value) else {
            continue;
        };
        let lab = to_lab(rgb);
        if kept
            .iter()
            .any(|(other, _)| lab_distance(*other, lab) < merge_distance)
        {
            continue;
        }
        kept.push((lab, rgb));
    }
    kept.into_iter()
        .enumerate()
        .map(|(i, (_, rgb))| CustomColor {
            id: ids.next_id(),
            title: slot_title(i, "Color"),
            color: to_hex(rgb),
        })
        .collect()
}

/// First family of each stack, generic families skipped, capped at `limit`.
pub fn derive_fonts(ranked: &[String], limit: usize, ids: &mut IdGenerator) -> Vec<CustomFont> {
    let mut families: Vec<String> = Vec::new();
    for stack in ranked {
        if families.len() >= limit {
            break;
        }
        let Some(family) = first_font_family(stack) else {
            continue;
        };
        if is_generic_family(&family)
            || families.iter().any(|f| f.eq_ignore_ascii_case(&family))
        {
            continue;
        }
        families.push(family);
    }
    families
        .into_iter()
        .enumerate()
        .map(|(i, family)| CustomFont {
            id: ids.next_id(),
            title: slot_title(i, "Font"),
            font_family: family,
        })
        .collect()
}
