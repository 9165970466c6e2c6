//! Structure classifier and template builder.
//!
//! Walks the desktop capture top-down, classifying nodes as sections,
//! columns and widgets through the [`RuleChain`]s in [`rules`], and
//! assembles the page-builder [`TemplateDocument`].
//!
//! ```no_run
//! use pcl_lib::classify::TemplateBuilder;
//! use pcl_lib::config::ClassifierConfig;
//! use pcl_lib::types::PageSnapshot;
//! use pcl_lib::viewport::Breakpoints;
//!
//! # fn run(snapshot: &PageSnapshot) {
//! let builder = TemplateBuilder::new(ClassifierConfig::default(), Breakpoints::default());
//! let document = builder.build(snapshot);
//! println!("{} sections", document.content.len());
//! # }
//! ```

pub mod columns;
pub mod governance;
pub mod ids;
pub mod palette;
pub mod rules;
pub mod style;
pub mod widgets;

use serde_json::json;
use tracing::{debug, info};

use crate::capture::assets::rank_by_frequency;
use crate::config::ClassifierConfig;
use crate::types::snapshot::is_painted_color;
use crate::types::{
    Column, DocumentMetadata, ElType, ElementNode, PageSettings, PageSnapshot, Section, Settings,
    TemplateDocument, Widget, TEMPLATE_VERSION,
};
use crate::viewport::{Breakpoint, Breakpoints};

pub use columns::{allocate_widths, column_weight, ColumnSource};
pub use governance::{govern, GovernanceReport};
pub use ids::IdGenerator;
pub use rules::{ParentContext, Role, Rule, RuleChain};
pub use widgets::create_widget;

const DEFAULT_TITLE: &str = "Cloned page";

/// A top-level item found under the page body.
enum RootItem<'a> {
    Section(&'a ElementNode),
    Widget(&'a ElementNode),
}

#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    config: ClassifierConfig,
    breakpoints: Breakpoints,
    root_rules: RuleChain,
    section_rules: RuleChain,
    column_rules: RuleChain,
}

impl TemplateBuilder {
    pub fn new(config: ClassifierConfig, breakpoints: Breakpoints) -> Self {
        Self {
            config,
            breakpoints,
            root_rules: RuleChain::root(),
            section_rules: RuleChain::section(),
            column_rules: RuleChain::column(),
        }
    }

    /// Replace the rule chain used for one parent context.
    pub fn with_rules(mut self, chain: RuleChain) -> Self {
        match chain.context() {
            ParentContext::Root => self.root_rules = chain,
            ParentContext::Section => self.section_rules = chain,
            ParentContext::Column => self.column_rules = chain,
        }
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn build(&self, snapshot: &PageSnapshot) -> TemplateDocument {
        self.build_with_ids(snapshot, &mut IdGenerator::new())
    }

    pub fn build_with_ids(&self, snapshot: &PageSnapshot, ids: &mut IdGenerator) -> TemplateDocument {
        let primary = snapshot.primary();
        let mut content = match primary {
            Some(capture) => self.sections(&capture.root, ids),
            None => Vec::new(),
        };
        if content.is_empty() {
            debug!(url = %snapshot.url, "no sections found; using placeholder content");
            content.push(self.placeholder_section(ids));
        }

        let (colors, fonts) = palette_sources(snapshot);
        let custom_colors = palette::derive_colors(
            &colors,
            self.config.palette_colors,
            self.config.color_merge_distance,
            ids,
        );
        let custom_fonts = palette::derive_fonts(&fonts, self.config.palette_fonts, ids);

        let width_of = |bp: Breakpoint| {
            snapshot
                .capture(bp)
                .map(|c| c.viewport_width)
                .unwrap_or_else(|| self.breakpoints.width(bp))
        };
        let title = snapshot.metadata.title.trim();

        let mut document = TemplateDocument {
            version: TEMPLATE_VERSION.to_string(),
            title: if title.is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title.to_string()
            },
            doc_type: "page".to_string(),
            content,
            page_settings: PageSettings {
                template: self.config.template.clone(),
                viewport_mobile: width_of(Breakpoint::Mobile),
                viewport_tablet: width_of(Breakpoint::Tablet),
                custom_css: primary.map(|c| c.css.clone()).unwrap_or_default(),
                custom_colors,
                custom_fonts,
            },
            metadata: DocumentMetadata {
                created_at: chrono::Utc::now().to_rfc3339(),
                source_url: snapshot.url.clone(),
                fidelity_score: None,
                total_elements: primary.map(|c| c.root.count()).unwrap_or(0),
                sections_count: 0,
                columns_count: 0,
                widgets_count: 0,
            },
        };
        document.refresh_counts();

        let counts = document.counts();
        info!(
            url = %snapshot.url,
            sections = counts.sections,
            columns = counts.columns,
            widgets = counts.widgets,
            "template built"
        );
        document
    }

    /// Top-level walk; wrappers without a role are flattened.
    fn root_items<'a>(&self, root: &'a ElementNode) -> Vec<RootItem<'a>> {
        let mut items = Vec::new();
        let mut stack: Vec<&ElementNode> = root.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            let decision = self.root_rules.classify(node, &self.config);
            match decision.role {
                Role::Section => items.push(RootItem::Section(node)),
                Role::Widget => items.push(RootItem::Widget(node)),
                Role::Column | Role::Descend => stack.extend(node.children.iter().rev()),
            }
        }
        items
    }

    fn sections(&self, root: &ElementNode, ids: &mut IdGenerator) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut loose: Vec<Widget> = Vec::new();

        for item in self.root_items(root) {
            match item {
                RootItem::Widget(node) => {
                    if let Some(widget) = create_widget(node, ids) {
                        loose.push(widget);
                    }
                }
                RootItem::Section(node) => {
                    if !loose.is_empty() {
                        sections.push(self.wrap_widgets(std::mem::take(&mut loose), ids));
                    }
                    if let Some(section) = self.build_section(node, ids) {
                        sections.push(section);
                    }
                }
            }
        }
        if !loose.is_empty() {
            sections.push(self.wrap_widgets(loose, ids));
        }
        sections
    }

    fn build_section(&self, node: &ElementNode, ids: &mut IdGenerator) -> Option<Section> {
        let parent = columns::layout_parent(node);
        let mut filled: Vec<(Option<&ElementNode>, Vec<Widget>)> = Vec::new();
        for source in columns::group_children(parent, &self.section_rules, &self.config) {
            let (style_node, widgets) = match source {
                ColumnSource::Node(column_root) => {
                    (Some(column_root), self.collect_widgets(column_root, ids))
                }
                ColumnSource::Loose(nodes) => (
                    None,
                    nodes.into_iter().filter_map(|n| create_widget(n, ids)).collect(),
                ),
            };
            if !widgets.is_empty() {
                filled.push((style_node, widgets));
            }
        }

        if filled.is_empty() {
            if !rules::paints_background(node) {
                debug!(tag = %node.tag, "section without convertible content dropped");
                return None;
            }
            let spacer = widgets::spacer_widget(node.style.height, ids);
            filled.push((None, vec![spacer]));
        }

        let weights: Vec<f64> = filled
            .iter()
            .map(|(_, w)| column_weight(w, &self.config))
            .collect();
        let sizes = allocate_widths(&weights, self.config.column_min, self.config.column_max);

        let elements = filled
            .into_iter()
            .zip(sizes)
            .map(|((style_node, widgets), size)| {
                let mut settings = Settings::new();
                settings.insert("_column_size".to_string(), json!(size));
                if let Some(style_node) = style_node {
                    style::apply_box_style(&mut settings, &style_node.style);
                }
                Column {
                    id: ids.next_id(),
                    el_type: ElType::Column,
                    settings,
                    elements: widgets,
                }
            })
            .collect();

        let mut settings = Settings::new();
        style::apply_box_style(&mut settings, &node.style);
        if rules::is_landmark(node) {
            settings.insert("html_tag".to_string(), json!(node.tag));
        }
        if !node.id.trim().is_empty() {
            settings.insert("_element_id".to_string(), json!(node.id.trim()));
        }
        Some(Section {
            id: ids.next_id(),
            el_type: ElType::Section,
            settings,
            elements,
        })
    }

    /// Widgets under one column root, in document order.
    fn collect_widgets(&self, column_root: &ElementNode, ids: &mut IdGenerator) -> Vec<Widget> {
        if column_root.is_leaf() || column_root.has_text() {
            return create_widget(column_root, ids).into_iter().collect();
        }
        let mut widgets = Vec::new();
        let mut stack: Vec<&ElementNode> = column_root.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            match self.column_rules.classify(node, &self.config).role {
                Role::Widget => widgets.extend(create_widget(node, ids)),
                _ => stack.extend(node.children.iter().rev()),
            }
        }
        widgets
    }

    /// One full-width section around widgets found directly under the body.
    fn wrap_widgets(&self, widgets: Vec<Widget>, ids: &mut IdGenerator) -> Section {
        let mut column_settings = Settings::new();
        column_settings.insert("_column_size".to_string(), json!(100));
        Section {
            id: ids.next_id(),
            el_type: ElType::Section,
            settings: Settings::new(),
            elements: vec![Column {
                id: ids.next_id(),
                el_type: ElType::Column,
                settings: column_settings,
                elements: widgets,
            }],
        }
    }

    fn placeholder_section(&self, ids: &mut IdGenerator) -> Section {
        let widget = widgets::welcome_widget(ids);
        self.wrap_widgets(vec![widget], ids)
    }
}

/// Ranked colors and font stacks: harvested assets first, the tree's own
/// computed styles when the harvest came back empty.
fn palette_sources(snapshot: &PageSnapshot) -> (Vec<String>, Vec<String>) {
    let tree = snapshot.primary().map(|c| &c.root);
    let colors = if snapshot.assets.colors.is_empty() {
        tree.map(|root| {
            rank_by_frequency(
                root.iter()
                    .flat_map(|n| [n.style.background_color.as_str(), n.style.color.as_str()])
                    .filter(|c| is_painted_color(c)),
            )
        })
        .unwrap_or_default()
    } else {
        snapshot.assets.colors.clone()
    };
    let fonts = if snapshot.assets.fonts.is_empty() {
        tree.map(|root| rank_by_frequency(root.iter().map(|n| n.style.font_family.as_str())))
            .unwrap_or_default()
    } else {
        snapshot.assets.fonts.clone()
    };
    (colors, fonts)
}

/// Classify `snapshot` with default rules.
pub fn build_template(
    snapshot: &PageSnapshot,
    config: &ClassifierConfig,
    breakpoints: &Breakpoints,
) -> TemplateDocument {
    TemplateBuilder::new(config.clone(), *breakpoints).build(snapshot)
}
