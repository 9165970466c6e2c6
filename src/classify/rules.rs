//! Ordered classification rules.
//!
//! Each parent context has its own [`RuleChain`]; the first rule whose
//! predicate holds decides the node's role. Rules are named so a decision can
//! be traced back to the threshold that produced it.

use std::fmt;

use crate::config::ClassifierConfig;
use crate::types::ElementNode;

pub const LANDMARK_TAGS: &[&str] = &["section", "header", "footer", "main", "article", "nav", "aside"];

pub const LAYOUT_TAGS: &[&str] = &["div", "article", "aside", "section"];

/// Tags that become a widget on their own, whatever they contain.
pub const WIDGET_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "img", "picture", "a", "button", "form", "input",
    "textarea", "select", "video", "iframe", "ul", "ol", "table", "svg", "blockquote", "pre",
    "nav", "menu", "label", "span", "strong", "em", "b", "i", "small", "code", "figcaption",
];

pub fn is_landmark(node: &ElementNode) -> bool {
    LANDMARK_TAGS.contains(&node.tag.as_str())
}

pub fn is_widget_tag(node: &ElementNode) -> bool {
    WIDGET_TAGS.contains(&node.tag.as_str())
}

pub fn is_layout_tag(node: &ElementNode) -> bool {
    LAYOUT_TAGS.contains(&node.tag.as_str())
}

pub fn paints_background(node: &ElementNode) -> bool {
    node.style.has_background_color() || node.style.has_background_image()
}

/// A plain wrapper: one child, no text or paint of its own.
pub fn is_transparent_wrapper(node: &ElementNode) -> bool {
    node.children.len() == 1
        && !is_landmark(node)
        && !is_widget_tag(node)
        && !node.has_text()
        && !paints_background(node)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Section,
    Column,
    Widget,
    /// No role of its own; its children are classified in the same context.
    Descend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentContext {
    Root,
    Section,
    Column,
}

impl fmt::Display for ParentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentContext::Root => f.write_str("root"),
            ParentContext::Section => f.write_str("section"),
            ParentContext::Column => f.write_str("column"),
        }
    }
}

pub type Predicate = fn(&ElementNode, &ClassifierConfig) -> bool;

#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub role: Role,
    predicate: Predicate,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish()
    }
}

impl Rule {
    pub fn new(name: &'static str, role: Role, predicate: Predicate) -> Self {
        Self {
            name,
            role,
            predicate,
        }
    }

    pub fn matches(&self, node: &ElementNode, config: &ClassifierConfig) -> bool {
        (self.predicate)(node, config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub role: Role,
    pub rule: &'static str,
}

#[derive(Debug, Clone)]
pub struct RuleChain {
    context: ParentContext,
    rules: Vec<Rule>,
    fallback: Role,
}

fn leaf(node: &ElementNode, _: &ClassifierConfig) -> bool {
    node.is_leaf()
}

fn landmark(node: &ElementNode, _: &ClassifierConfig) -> bool {
    is_landmark(node)
}

fn widget_tag(node: &ElementNode, _: &ClassifierConfig) -> bool {
    is_widget_tag(node)
}

fn single_child_wrapper(node: &ElementNode, _: &ClassifierConfig) -> bool {
    is_transparent_wrapper(node)
}

fn landmark_wrapper(node: &ElementNode, _: &ClassifierConfig) -> bool {
    node.children.iter().any(is_landmark)
}

fn sizeable(node: &ElementNode, config: &ClassifierConfig) -> bool {
    node.style.height > config.section_min_height && node.style.width > config.section_min_width
}

fn many_children(node: &ElementNode, config: &ClassifierConfig) -> bool {
    node.children.len() > config.section_child_count
}

fn layout_div(node: &ElementNode, config: &ClassifierConfig) -> bool {
    node.tag == "div"
        && (node.style.is_flex_or_grid()
            || node
                .children
                .iter()
                .any(|c| c.style.width >= config.wide_child_width))
}

fn has_children(node: &ElementNode, _: &ClassifierConfig) -> bool {
    !node.children.is_empty()
}

fn layout_tag_with_content(node: &ElementNode, _: &ClassifierConfig) -> bool {
    is_layout_tag(node) && node.has_content()
}

fn own_text(node: &ElementNode, _: &ClassifierConfig) -> bool {
    node.has_text()
}

impl RuleChain {
    /// Nodes directly under the page body.
    pub fn root() -> Self {
        Self {
            context: ParentContext::Root,
            rules: vec![
                Rule::new("leaf", Role::Widget, leaf),
                Rule::new("landmark", Role::Section, landmark),
                Rule::new("widget-tag", Role::Widget, widget_tag),
                Rule::new("single-child-wrapper", Role::Descend, single_child_wrapper),
                Rule::new("landmark-wrapper", Role::Descend, landmark_wrapper),
                Rule::new("sizeable-container", Role::Section, sizeable),
                Rule::new("many-children", Role::Section, many_children),
                Rule::new("layout-div", Role::Section, layout_div),
            ],
            fallback: Role::Descend,
        }
    }

    /// Children of a section.
    pub fn section() -> Self {
        Self {
            context: ParentContext::Section,
            rules: vec![
                Rule::new("widget-tag", Role::Widget, widget_tag),
                Rule::new("has-children", Role::Column, has_children),
                Rule::new("layout-tag-with-content", Role::Column, layout_tag_with_content),
            ],
            fallback: Role::Widget,
        }
    }

    /// Descendants of a column.
    pub fn column() -> Self {
        Self {
            context: ParentContext::Column,
            rules: vec![
                Rule::new("widget-tag", Role::Widget, widget_tag),
                Rule::new("leaf", Role::Widget, leaf),
                Rule::new("own-text", Role::Widget, own_text),
            ],
            fallback: Role::Descend,
        }
    }

    pub fn for_context(context: ParentContext) -> Self {
        match context {
            ParentContext::Root => Self::root(),
            ParentContext::Section => Self::section(),
            ParentContext::Column => Self::column(),
        }
    }

    pub fn context(&self) -> ParentContext {
        self.context
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Insert `rule` ahead of the rule named `before`, or at the end.
    pub fn insert_before(&mut self, before: &str, rule: Rule) {
        let at = self
            .rules
            .iter()
            .position(|r| r.name == before)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, rule);
    }

    pub fn classify(&self, node: &ElementNode, config: &ClassifierConfig) -> Decision {
        self.rules
            .iter()
            .find(|rule| rule.matches(node, config))
            .map(|rule| Decision {
                role: rule.role,
                rule: rule.name,
            })
            .unwrap_or(Decision {
                role: self.fallback,
                rule: "fallback",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StyleSnapshot;

    fn node(tag: &str, children: Vec<ElementNode>) -> ElementNode {
        ElementNode {
            tag: tag.to_string(),
            children,
            ..ElementNode::default()
        }
    }

    fn sized(tag: &str, width: f64, height: f64, children: Vec<ElementNode>) -> ElementNode {
        ElementNode {
            style: StyleSnapshot {
                width,
                height,
                ..StyleSnapshot::default()
            },
            ..node(tag, children)
        }
    }

    fn root_rule(n: &ElementNode) -> Decision {
        RuleChain::root().classify(n, &ClassifierConfig::default())
    }

    #[test]
    fn leaves_are_widgets_at_the_root() {
        let d = root_rule(&node("div", vec![]));
        assert_eq!(d.role, Role::Widget);
        assert_eq!(d.rule, "leaf");
    }

    #[test]
    fn landmarks_become_sections() {
        let d = root_rule(&node("header", vec![node("h1", vec![])]));
        assert_eq!(d.role, Role::Section);
        assert_eq!(d.rule, "landmark");
    }

    #[test]
    fn wrappers_are_descended() {
        let wrapper = node("div", vec![node("div", vec![node("p", vec![])])]);
        assert_eq!(root_rule(&wrapper).rule, "single-child-wrapper");

        let app = node(
            "div",
            vec![node("header", vec![]), node("main", vec![]), node("footer", vec![])],
        );
        let d = root_rule(&app);
        assert_eq!(d.role, Role::Descend);
        assert_eq!(d.rule, "landmark-wrapper");
    }

    #[test]
    fn painted_single_child_wrapper_is_not_transparent() {
        let mut wrapper = node("div", vec![node("p", vec![])]);
        wrapper.style.background_color = "rgb(200, 0, 0)".to_string();
        assert!(!is_transparent_wrapper(&wrapper));
    }

    #[test]
    fn size_and_child_count_rules() {
        let big = sized("div", 1200.0, 400.0, vec![node("p", vec![]), node("p", vec![])]);
        assert_eq!(root_rule(&big).rule, "sizeable-container");

        let many = sized(
            "div",
            100.0,
            50.0,
            vec![node("p", vec![]), node("p", vec![]), node("p", vec![])],
        );
        assert_eq!(root_rule(&many).rule, "many-children");

        let mut flex = sized("div", 100.0, 50.0, vec![node("p", vec![]), node("p", vec![])]);
        flex.style.display = "flex".to_string();
        assert_eq!(root_rule(&flex).rule, "layout-div");

        let plain = sized("div", 100.0, 50.0, vec![node("p", vec![]), node("p", vec![])]);
        assert_eq!(root_rule(&plain).role, Role::Descend);
    }

    #[test]
    fn thresholds_come_from_config() {
        let config = ClassifierConfig {
            section_min_height: 50.0,
            ..ClassifierConfig::default()
        };
        let n = sized("div", 400.0, 60.0, vec![node("p", vec![]), node("p", vec![])]);
        assert_eq!(RuleChain::root().classify(&n, &config).role, Role::Section);
        assert_eq!(root_rule(&n).role, Role::Descend);
    }

    #[test]
    fn section_children() {
        let chain = RuleChain::section();
        let config = ClassifierConfig::default();
        assert_eq!(chain.classify(&node("h2", vec![]), &config).role, Role::Widget);
        assert_eq!(
            chain.classify(&node("div", vec![node("p", vec![])]), &config).role,
            Role::Column
        );
        let mut text_div = node("div", vec![]);
        text_div.text = "Hello".to_string();
        assert_eq!(chain.classify(&text_div, &config).rule, "layout-tag-with-content");
        assert_eq!(chain.classify(&node("hr", vec![]), &config).rule, "fallback");
    }

    #[test]
    fn custom_rules_can_be_inserted() {
        let mut chain = RuleChain::root();
        chain.insert_before(
            "landmark",
            Rule::new("skip-cookie-banner", Role::Descend, |n, _| {
                n.class_name.contains("cookie")
            }),
        );
        let mut banner = node("section", vec![node("p", vec![])]);
        banner.class_name = "cookie-banner".to_string();
        let d = chain.classify(&banner, &ClassifierConfig::default());
        assert_eq!(d.rule, "skip-cookie-banner");
        assert_eq!(chain.context(), ParentContext::Root);
    }
}
