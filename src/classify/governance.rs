//! Size governance for assembled documents.
//!
//! Three passes, each only when the previous one was not enough:
//! 1. clean: oversized markup fields are replaced by a short placeholder
//! 2. compact: empty settings and element ids that repeat the node id are
//!    stripped, markup and custom CSS are minified in place
//! 3. truncate: only the first few sections are kept

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::GovernanceConfig;
use crate::types::{Settings, TemplateDocument};

/// Settings that hold captured markup verbatim.
pub const MARKUP_KEYS: &[&str] = &["html", "form_html", "editor", "title"];

/// Settings that survive compaction even when empty.
const ESSENTIAL_KEYS: &[&str] = &["_column_size", "_element_id"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceReport {
    pub cleaned_fields: usize,
    pub compacted: bool,
    pub truncated_sections: usize,
    pub original_bytes: usize,
    pub final_bytes: usize,
}

impl GovernanceReport {
    pub fn triggered(&self) -> bool {
        self.cleaned_fields > 0 || self.compacted || self.truncated_sections > 0
    }
}

fn html_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("html comment regex is valid"))
}

fn css_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("css comment regex is valid"))
}

fn between_tags_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r">\s+<").expect("tag whitespace regex is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").expect("whitespace regex is valid"))
}

/// Strip HTML comments and collapse whitespace runs to one space. Text,
/// including the gap between inline elements, is kept.
pub fn minify_markup(markup: &str) -> String {
    let without_comments = html_comment_regex().replace_all(markup, "");
    let tight = between_tags_regex().replace_all(&without_comments, "> <");
    whitespace_regex().replace_all(&tight, " ").trim().to_string()
}

/// Strip `/* */` comments and collapse whitespace in a stylesheet.
pub fn minify_css(css: &str) -> String {
    let without_comments = css_comment_regex().replace_all(css, "");
    whitespace_regex().replace_all(&without_comments, " ").trim().to_string()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn settings_maps(doc: &mut TemplateDocument) -> Vec<&mut Settings> {
    let mut maps = Vec::new();
    for section in &mut doc.content {
        maps.push(&mut section.settings);
        for column in &mut section.elements {
            maps.push(&mut column.settings);
            for widget in &mut column.elements {
                maps.push(&mut widget.settings);
            }
        }
    }
    maps
}

fn clean_fields(doc: &mut TemplateDocument, config: &GovernanceConfig) -> usize {
    let mut cleaned = 0;
    for settings in settings_maps(doc) {
        for key in MARKUP_KEYS {
            if let Some(Value::String(value)) = settings.get_mut(*key) {
                if value.len() > config.field_limit {
                    *value = config.placeholder.clone();
                    cleaned += 1;
                }
            }
        }
    }
    if doc.page_settings.custom_css.len() > config.field_limit {
        doc.page_settings.custom_css = config.placeholder.clone();
        cleaned += 1;
    }
    cleaned
}

/// Drop `_element_id` values that only repeat the owner's id; rendering
/// falls back to the id.
fn drop_redundant_element_ids(doc: &mut TemplateDocument) {
    fn strip(settings: &mut Settings, id: &str) {
        if settings.get("_element_id").and_then(Value::as_str) == Some(id) {
            settings.remove("_element_id");
        }
    }
    for section in &mut doc.content {
        strip(&mut section.settings, &section.id);
        for column in &mut section.elements {
            strip(&mut column.settings, &column.id);
            for widget in &mut column.elements {
                strip(&mut widget.settings, &widget.id);
            }
        }
    }
}

fn compact(doc: &mut TemplateDocument, config: &GovernanceConfig) {
    drop_redundant_element_ids(doc);
    for settings in settings_maps(doc) {
        settings.retain(|key, value| ESSENTIAL_KEYS.contains(&key.as_str()) || !is_empty_value(value));
        for key in MARKUP_KEYS {
            if let Some(Value::String(value)) = settings.get_mut(*key) {
                if *value != config.placeholder {
                    *value = minify_markup(value);
                }
            }
        }
    }
    if doc.page_settings.custom_css != config.placeholder {
        doc.page_settings.custom_css = minify_css(&doc.page_settings.custom_css);
    }
}

/// Keep `doc` under the configured size limits.
pub fn govern(doc: &mut TemplateDocument, config: &GovernanceConfig) -> GovernanceReport {
    let original_bytes = doc.serialized_len();
    let mut report = GovernanceReport {
        original_bytes,
        ..GovernanceReport::default()
    };

    report.cleaned_fields = clean_fields(doc, config);
    if report.cleaned_fields > 0 {
        info!(fields = report.cleaned_fields, "oversized markup fields replaced");
    }

    if doc.serialized_len() > config.document_limit {
        let before = doc.serialized_len();
        compact(doc, config);
        report.compacted = true;
        info!(before, after = doc.serialized_len(), "document compacted");
    }

    if doc.serialized_len() > config.document_limit && doc.content.len() > config.keep_sections {
        report.truncated_sections = doc.content.len() - config.keep_sections;
        doc.content.truncate(config.keep_sections);
        doc.refresh_counts();
        warn!(
            dropped = report.truncated_sections,
            kept = config.keep_sections,
            "document still oversized; trailing sections dropped"
        );
    }

    report.final_bytes = doc.serialized_len();
    report
}
