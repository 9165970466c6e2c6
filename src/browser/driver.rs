use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::raw::{RawAssets, RawLayout, RawTree};
use crate::{PclError, Result, Viewport};

/// How long navigation waits before the page counts as loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    /// No network activity at all for 500 ms.
    NetworkIdleStrict,
    /// `load` fired and at most two requests in flight for 500 ms.
    NetworkIdleRelaxed,
    /// `DOMContentLoaded` plus a fixed settle delay.
    DomReady,
}

impl WaitStrategy {
    /// Strategies in the order they are attempted.
    pub const fn cascade() -> [WaitStrategy; 3] {
        [
            WaitStrategy::NetworkIdleStrict,
            WaitStrategy::NetworkIdleRelaxed,
            WaitStrategy::DomReady,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStrategy::NetworkIdleStrict => "network-idle-strict",
            WaitStrategy::NetworkIdleRelaxed => "network-idle-relaxed",
            WaitStrategy::DomReady => "dom-ready",
        }
    }
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits applied by the in-page tree walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOptions {
    pub max_depth: usize,
    pub markup_limit: usize,
    pub html_limit: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: 50,
            markup_limit: 50_000,
            html_limit: 2_000_000,
        }
    }
}

/// A browser engine that hands out isolated page contexts.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn open_context(&self, viewport: Viewport) -> Result<Box<dyn PageContext>>;
    async fn shutdown(&self) -> Result<()>;
    fn active_contexts(&self) -> usize;
}

/// One isolated page. Callers must `close` it on every path.
#[async_trait]
pub trait PageContext: Send {
    async fn navigate(
        &mut self,
        url: &str,
        strategy: WaitStrategy,
        timeout: Duration,
        settle: Duration,
    ) -> Result<()>;
    async fn set_content(&mut self, html: &str) -> Result<()>;
    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;
    /// Scroll to the bottom in fixed steps and back to the top.
    async fn scroll_lazy_content(&mut self, step_px: u32, pause: Duration) -> Result<()>;
    async fn capture_tree(&mut self, options: TreeOptions) -> Result<RawTree>;
    async fn harvest_assets(&mut self) -> Result<RawAssets>;
    /// Full-page screenshot (when a path is given) plus the layout snapshot.
    async fn capture_layout(&mut self, screenshot_path: Option<&Path>) -> Result<RawLayout>;
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A driver with no browser behind it; every context request fails.
#[derive(Debug, Clone, Default)]
pub struct OfflineDriver {
    reason: String,
}

impl OfflineDriver {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl PageDriver for OfflineDriver {
    async fn open_context(&self, _viewport: Viewport) -> Result<Box<dyn PageContext>> {
        let reason = if self.reason.is_empty() {
            "no browser available"
        } else {
            self.reason.as_str()
        };
        Err(PclError::browser(format!("Browser unavailable: {reason}")))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        0
    }
}
