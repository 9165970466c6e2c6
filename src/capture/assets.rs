//! Turns the raw page harvest into a deduplicated [`AssetBundle`].

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::browser::raw::{RawAssets, RawImage};
use crate::resource::resolve_reference;
use crate::types::{AssetBundle, FontFaceAsset, ImageAsset, LinkAsset, VideoAsset};
use crate::types::snapshot::is_painted_color;

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "ui-rounded",
    "emoji",
    "math",
    "fangsong",
    "inherit",
    "initial",
    "-apple-system",
    "blinkmacsystemfont",
];

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*["']?(.*?)["']?\s*\)"#).expect("css url regex is valid")
    })
}

/// Targets of every `url(...)` in a CSS value, in order.
pub fn extract_css_urls(value: &str) -> Vec<String> {
    css_url_regex()
        .captures_iter(value)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// First family in a `font-family` stack, unquoted.
pub fn first_font_family(stack: &str) -> Option<String> {
    let first = stack.split(',').next()?.trim();
    let unquoted = first.trim_matches(|c| c == '"' || c == '\'').trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}

pub fn is_generic_family(family: &str) -> bool {
    let lower = family.to_ascii_lowercase();
    GENERIC_FAMILIES.contains(&lower.as_str())
}

/// Distinct values ordered by descending frequency; ties keep first-seen order.
pub fn rank_by_frequency<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        let entry = counts.entry(value.to_string()).or_insert((0, position));
        entry.0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().map(|(value, _)| value).collect()
}

/// Real image source, preferring lazy-load attributes over placeholders.
pub fn lazy_image_source(image: &RawImage) -> Option<String> {
    let srcset_first = image
        .srcset
        .split(',')
        .next()
        .and_then(|candidate| candidate.split_whitespace().next())
        .unwrap_or("");
    [
        image.data_src.as_str(),
        image.data_lazy_src.as_str(),
        image.src.as_str(),
        srcset_first,
    ]
    .into_iter()
    .map(str::trim)
    .find(|candidate| !candidate.is_empty() && !candidate.starts_with("data:"))
    .map(str::to_string)
}

fn dedupe_strings(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn dedupe_links(values: Vec<LinkAsset>) -> Vec<LinkAsset> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|l| seen.insert((l.href.clone(), l.text.clone())))
        .collect()
}

/// Build the bundle; returns it together with any harvest warnings.
pub fn build_asset_bundle(raw: RawAssets, page_url: &str) -> (AssetBundle, Vec<String>) {
    let base = Url::parse(page_url).ok();
    let resolve = |value: &str| -> Option<String> {
        match &base {
            Some(base) => resolve_reference(base, value),
            None => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
        }
    };

    let mut seen_images = HashSet::new();
    let mut images = Vec::new();
    for image in &raw.images {
        let Some(src) = lazy_image_source(image).and_then(|s| resolve(&s)) else {
            continue;
        };
        if seen_images.insert(src.clone()) {
            images.push(ImageAsset {
                src,
                alt: image.alt.clone(),
                width: image.width,
                height: image.height,
            });
        }
    }
    for background in &raw.background_images {
        for target in extract_css_urls(background) {
            if let Some(src) = resolve(&target) {
                if seen_images.insert(src.clone()) {
                    images.push(ImageAsset {
                        src,
                        ..ImageAsset::default()
                    });
                }
            }
        }
    }

    let mut seen_faces = HashSet::new();
    let font_faces: Vec<FontFaceAsset> = raw
        .font_faces
        .iter()
        .filter_map(|face| {
            let family = first_font_family(&face.family)?;
            let sources: Vec<String> = extract_css_urls(&face.src)
                .iter()
                .filter_map(|s| resolve(s))
                .collect();
            let key = (family.clone(), sources.clone());
            seen_faces
                .insert(key)
                .then_some(FontFaceAsset { family, sources })
        })
        .collect();

    let fonts: Vec<String> = rank_by_frequency(
        raw.font_families
            .iter()
            .filter_map(|stack| first_font_family(stack))
            .filter(|family| !is_generic_family(family)),
    );

    let colors = rank_by_frequency(raw.colors.iter().filter(|c| is_painted_color(c)));

    let mut seen_videos = HashSet::new();
    let videos: Vec<VideoAsset> = raw
        .videos
        .into_iter()
        .filter_map(|video| {
            let src = resolve(&video.src)?;
            seen_videos.insert(src.clone()).then_some(VideoAsset {
                src,
                tag: video.tag,
            })
        })
        .collect();

    let links = dedupe_links(
        raw.links
            .into_iter()
            .filter(|l| !l.href.trim().is_empty())
            .collect(),
    );

    let bundle = AssetBundle {
        images,
        fonts,
        font_faces,
        colors,
        gradients: dedupe_strings(raw.gradients),
        videos,
        forms: raw.forms,
        buttons: dedupe_links(raw.buttons),
        links,
        stylesheets: dedupe_strings(raw.stylesheets),
        scripts: dedupe_strings(raw.scripts),
    };
    (bundle, dedupe_strings(raw.warnings))
}
