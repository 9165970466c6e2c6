//! Raw payloads returned by the browser helper and the tree rebuild.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{
    ElementNode, FormAsset, LayoutEntry, LinkAsset, PageMetadata, StructureCounts, StyleSnapshot,
    VideoAsset,
};

/// One element from the in-page walker, in pre-order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNode {
    pub tag: String,
    pub id: String,
    pub class_name: String,
    pub text: String,
    pub inner_html: String,
    pub outer_html: String,
    pub style: StyleSnapshot,
    pub attributes: BTreeMap<String, String>,
    /// Index of the parent in the same list; always smaller than the node's own.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTree {
    pub nodes: Vec<RawNode>,
    pub html: String,
    pub css: String,
    /// Branches cut by the walker's depth guard.
    pub truncated: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawImage {
    pub src: String,
    pub alt: String,
    pub width: f64,
    pub height: f64,
    pub data_src: String,
    pub data_lazy_src: String,
    pub srcset: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFontFace {
    pub family: String,
    pub src: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAssets {
    pub metadata: PageMetadata,
    pub images: Vec<RawImage>,
    /// Computed `background-image` values that are not gradients.
    pub background_images: Vec<String>,
    pub gradients: Vec<String>,
    pub font_faces: Vec<RawFontFace>,
    /// Computed `font-family` stacks, one per element (duplicates kept).
    pub font_families: Vec<String>,
    /// Computed colors, one per element and property (duplicates kept).
    pub colors: Vec<String>,
    pub videos: Vec<VideoAsset>,
    pub forms: Vec<FormAsset>,
    pub buttons: Vec<LinkAsset>,
    pub links: Vec<LinkAsset>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLayout {
    pub elements: Vec<LayoutEntry>,
    pub counts: StructureCounts,
}

/// Rebuild the element tree from a pre-order list with parent indices.
///
/// Works in two linear passes and never recurses: a forward pass computes
/// depths (dropping nodes past `max_depth` or with a broken parent link), and
/// a reverse pass moves every node into its parent. Because children always
/// follow their parent, a node is complete by the time the reverse pass
/// reaches it.
pub fn build_tree(nodes: Vec<RawNode>, max_depth: usize) -> Option<ElementNode> {
    if nodes.is_empty() {
        return None;
    }

    let mut depths: Vec<Option<usize>> = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        let depth = match node.parent {
            None if index == 0 => Some(0),
            None => None,
            Some(parent) if parent < index => depths[parent]
                .map(|d| d + 1)
                .filter(|d| *d <= max_depth),
            Some(_) => None,
        };
        depths.push(depth);
    }

    let parents: Vec<Option<usize>> = nodes.iter().map(|n| n.parent).collect();
    let mut built: Vec<Option<ElementNode>> = nodes
        .into_iter()
        .zip(depths.iter())
        .map(|(raw, depth)| depth.map(|d| into_element(raw, d)))
        .collect();

    for index in (1..built.len()).rev() {
        let Some(mut node) = built[index].take() else {
            continue;
        };
        node.children.reverse();
        if let Some(parent) = parents[index].and_then(|p| built[p].as_mut()) {
            parent.children.push(node);
        }
    }

    let mut root = built[0].take()?;
    root.children.reverse();
    Some(root)
}

fn into_element(raw: RawNode, depth: usize) -> ElementNode {
    ElementNode {
        tag: raw.tag.to_ascii_lowercase(),
        id: raw.id,
        class_name: raw.class_name,
        text: raw.text,
        inner_html: raw.inner_html,
        outer_html: raw.outer_html,
        style: raw.style,
        children: Vec::new(),
        depth,
        attributes: raw.attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(tag: &str, parent: Option<usize>) -> RawNode {
        RawNode {
            tag: tag.to_string(),
            parent,
            ..RawNode::default()
        }
    }

    #[test]
    fn rebuilds_children_in_document_order() {
        let nodes = vec![
            raw("body", None),
            raw("header", Some(0)),
            raw("h1", Some(1)),
            raw("p", Some(1)),
            raw("main", Some(0)),
        ];
        let root = build_tree(nodes, 50).expect("root");
        assert_eq!(root.tag, "body");
        let tags: Vec<&str> = root.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["header", "main"]);
        let header_tags: Vec<&str> = root.children[0]
            .children
            .iter()
            .map(|c| c.tag.as_str())
            .collect();
        assert_eq!(header_tags, vec!["h1", "p"]);
        assert_eq!(root.children[0].children[1].depth, 2);
    }

    #[test]
    fn depth_guard_truncates_branches() {
        let mut nodes = vec![raw("body", None)];
        for i in 0..10 {
            nodes.push(raw("div", Some(i)));
        }
        let root = build_tree(nodes, 3).expect("root");
        let max_depth = root.iter().map(|n| n.depth).max().unwrap();
        assert_eq!(max_depth, 3);
        assert_eq!(root.count(), 4);
    }

    #[test]
    fn broken_parent_links_are_dropped() {
        let nodes = vec![raw("body", None), raw("div", Some(5)), raw("p", Some(0))];
        let root = build_tree(nodes, 50).expect("root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].tag, "p");
    }

    #[test]
    fn empty_list_has_no_tree() {
        assert!(build_tree(Vec::new(), 50).is_none());
    }
}
