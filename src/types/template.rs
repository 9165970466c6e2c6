//! The emitted page-builder document.
//!
//! Field names and nesting follow the page-builder import format exactly;
//! `Section`, `Column` and `Widget` carry their own `elType` tag so the JSON
//! can be consumed without knowing the Rust types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TEMPLATE_VERSION: &str = "0.4";

pub type Settings = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElType {
    Section,
    Column,
    Widget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetType {
    Heading,
    Text,
    Image,
    Button,
    Video,
    Form,
    Html,
    NavMenu,
    Spacer,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::Heading => "heading",
            WidgetType::Text => "text",
            WidgetType::Image => "image",
            WidgetType::Button => "button",
            WidgetType::Video => "video",
            WidgetType::Form => "form",
            WidgetType::Html => "html",
            WidgetType::NavMenu => "nav-menu",
            WidgetType::Spacer => "spacer",
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, WidgetType::Image | WidgetType::Video)
    }

    pub fn is_form_like(&self) -> bool {
        matches!(self, WidgetType::Form)
    }
}

impl std::fmt::Display for WidgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    #[serde(rename = "elType")]
    pub el_type: ElType,
    #[serde(rename = "widgetType")]
    pub widget_type: WidgetType,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    #[serde(rename = "elType")]
    pub el_type: ElType,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub elements: Vec<Widget>,
}

impl Column {
    pub fn size(&self) -> Option<f64> {
        self.settings.get("_column_size").and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(rename = "elType")]
    pub el_type: ElType,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub elements: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomColor {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFont {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub font_family: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    pub template: String,
    pub viewport_mobile: u32,
    pub viewport_tablet: u32,
    #[serde(default)]
    pub custom_css: String,
    #[serde(default)]
    pub custom_colors: Vec<CustomColor>,
    #[serde(default)]
    pub custom_fonts: Vec<CustomFont>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub created_at: String,
    pub source_url: String,
    pub fidelity_score: Option<f64>,
    pub total_elements: usize,
    pub sections_count: usize,
    #[serde(default)]
    pub columns_count: usize,
    #[serde(default)]
    pub widgets_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub version: String,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: Vec<Section>,
    pub page_settings: PageSettings,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCounts {
    pub sections: usize,
    pub columns: usize,
    pub widgets: usize,
}

impl TemplateDocument {
    pub fn counts(&self) -> LayoutCounts {
        let sections = self.content.len();
        let columns = self.content.iter().map(|s| s.elements.len()).sum();
        let widgets = self.widgets().count();
        LayoutCounts {
            sections,
            columns,
            widgets,
        }
    }

    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.content
            .iter()
            .flat_map(|s| s.elements.iter())
            .flat_map(|c| c.elements.iter())
    }

    /// Every node id in document order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for section in &self.content {
            ids.push(section.id.as_str());
            for column in &section.elements {
                ids.push(column.id.as_str());
                ids.extend(column.elements.iter().map(|w| w.id.as_str()));
            }
        }
        ids
    }

    /// Refresh the count fields in `metadata` from the content tree.
    pub fn refresh_counts(&mut self) {
        let counts = self.counts();
        self.metadata.sections_count = counts.sections;
        self.metadata.columns_count = counts.columns;
        self.metadata.widgets_count = counts.widgets;
    }

    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn widget_serializes_with_builder_field_names() {
        let mut settings = Settings::new();
        settings.insert("_element_id".to_string(), json!("hero"));
        let widget = Widget {
            id: "a1B2c3D4".to_string(),
            el_type: ElType::Widget,
            widget_type: WidgetType::NavMenu,
            settings,
        };
        let value = serde_json::to_value(&widget).unwrap();
        assert_eq!(value["elType"], "widget");
        assert_eq!(value["widgetType"], "nav-menu");
        assert_eq!(value["settings"]["_element_id"], "hero");
        assert!(value.get("elements").is_none());
    }

    #[test]
    fn document_type_field_is_renamed() {
        let doc = TemplateDocument {
            version: TEMPLATE_VERSION.to_string(),
            title: "t".to_string(),
            doc_type: "page".to_string(),
            content: vec![],
            page_settings: PageSettings {
                template: "elementor_canvas".to_string(),
                viewport_mobile: 375,
                viewport_tablet: 768,
                custom_css: String::new(),
                custom_colors: vec![],
                custom_fonts: vec![],
            },
            metadata: DocumentMetadata {
                created_at: "2024-01-01T00:00:00Z".to_string(),
                source_url: "https://example.com".to_string(),
                fidelity_score: None,
                total_elements: 0,
                sections_count: 0,
                columns_count: 0,
                widgets_count: 0,
            },
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "page");
        assert_eq!(value["version"], "0.4");
        assert!(value["metadata"]["fidelity_score"].is_null());
    }
}
