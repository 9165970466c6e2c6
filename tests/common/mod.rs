//! A scripted page driver that replays fixed trees and layouts, so the
//! capture and verification pipelines run without a browser.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pcl_lib::browser::{RawAssets, RawLayout, RawNode, RawTree, TreeOptions};
use pcl_lib::config::Config;
use pcl_lib::types::{LayoutEntry, StructureCounts, StyleSnapshot};
use pcl_lib::{PageContext, PageDriver, PclError, Result, Viewport, WaitStrategy};

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub tree: RawTree,
    pub assets: RawAssets,
    pub layout: RawLayout,
    /// Wait strategies whose navigation attempt fails.
    pub failing_strategies: Vec<WaitStrategy>,
    pub fail_set_content: bool,
    /// Size of the fake screenshot written per capture; none when unset.
    pub screenshot_bytes: Option<usize>,
}

#[derive(Clone)]
pub struct ScriptedDriver {
    script: Arc<Script>,
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
}

impl ScriptedDriver {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            events: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_starting_with(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Contexts opened and not yet closed.
    pub fn open_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn open_context(&self, viewport: Viewport) -> Result<Box<dyn PageContext>> {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.record(format!("open:{}", viewport.width));
        Ok(Box::new(ScriptedContext {
            driver: self.clone(),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct ScriptedContext {
    driver: ScriptedDriver,
}

#[async_trait]
impl PageContext for ScriptedContext {
    async fn navigate(
        &mut self,
        _url: &str,
        strategy: WaitStrategy,
        _timeout: Duration,
        _settle: Duration,
    ) -> Result<()> {
        self.driver.record(format!("navigate:{strategy}"));
        if self.driver.script.failing_strategies.contains(&strategy) {
            return Err(PclError::browser(format!("{strategy} timed out")));
        }
        Ok(())
    }

    async fn set_content(&mut self, _html: &str) -> Result<()> {
        self.driver.record("set-content".to_string());
        if self.driver.script.fail_set_content {
            return Err(PclError::browser("page crashed while rendering"));
        }
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.driver.record(format!("viewport:{}", viewport.width));
        Ok(())
    }

    async fn scroll_lazy_content(&mut self, _step_px: u32, _pause: Duration) -> Result<()> {
        self.driver.record("scroll".to_string());
        Ok(())
    }

    async fn capture_tree(&mut self, _options: TreeOptions) -> Result<RawTree> {
        Ok(self.driver.script.tree.clone())
    }

    async fn harvest_assets(&mut self) -> Result<RawAssets> {
        Ok(self.driver.script.assets.clone())
    }

    async fn capture_layout(&mut self, screenshot_path: Option<&Path>) -> Result<RawLayout> {
        if let (Some(path), Some(bytes)) = (screenshot_path, self.driver.script.screenshot_bytes) {
            std::fs::write(path, vec![0x5a; bytes])?;
        }
        Ok(self.driver.script.layout.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.driver.active.fetch_sub(1, Ordering::SeqCst);
        self.driver.record("close".to_string());
        Ok(())
    }
}

pub fn raw(tag: &str, parent: Option<usize>) -> RawNode {
    RawNode {
        tag: tag.to_string(),
        parent,
        ..RawNode::default()
    }
}

pub fn raw_text(tag: &str, parent: usize, text: &str) -> RawNode {
    RawNode {
        tag: tag.to_string(),
        text: text.to_string(),
        inner_html: text.to_string(),
        parent: Some(parent),
        ..RawNode::default()
    }
}

pub fn tree(nodes: Vec<RawNode>) -> RawTree {
    RawTree {
        nodes,
        ..RawTree::default()
    }
}

/// `<body><h1>Hello</h1><p>World</p></body>`
pub fn heading_and_paragraph() -> RawTree {
    tree(vec![
        raw("body", None),
        raw_text("h1", 0, "Hello"),
        raw_text("p", 0, "World"),
    ])
}

/// A flex row of three equal cards, each with a heading and a paragraph.
pub fn three_card_row() -> RawTree {
    let mut nodes = vec![raw("body", None), raw("div", Some(0))];
    nodes[1].style.display = "flex".to_string();
    for (i, x) in [0.0, 400.0, 800.0].into_iter().enumerate() {
        let mut card = raw("div", Some(1));
        card.style = StyleSnapshot {
            x,
            width: 390.0,
            height: 200.0,
            ..StyleSnapshot::default()
        };
        let card_index = nodes.len();
        nodes.push(card);
        nodes.push(raw_text("h3", card_index, &format!("Card {}", i + 1)));
        nodes.push(raw_text("p", card_index, "Copy"));
    }
    tree(nodes)
}

/// A layout with some of every structural category except images.
pub fn layout(elements: usize) -> RawLayout {
    RawLayout {
        elements: (0..elements)
            .map(|i| LayoutEntry {
                tag: "div".to_string(),
                y: i as f64 * 20.0,
                width: 1200.0,
                height: 20.0,
                display: "block".to_string(),
                ..LayoutEntry::default()
            })
            .collect(),
        counts: StructureCounts {
            total_elements: elements,
            text_nodes: 4,
            images: 0,
            sections: 1,
            containers: 3,
            headings: 1,
            links: 2,
        },
    }
}

pub fn assets_with_title(title: &str) -> RawAssets {
    let mut assets = RawAssets::default();
    assets.metadata.title = title.to_string();
    assets
}

/// Defaults with every settle delay removed.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.capture.scroll_pause = Duration::ZERO;
    config.capture.lazy_settle = Duration::ZERO;
    config.capture.reflow_delay = Duration::ZERO;
    config.capture.dom_ready_settle = Duration::ZERO;
    config
}
