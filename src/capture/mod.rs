//! Snapshot capture: load a live page and record its element tree at every
//! breakpoint, plus the page-level assets.

pub mod assets;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::browser::{
    build_tree, navigate_with_fallback, NavigationPolicy, PageContext, PageDriver, RawTree,
    TreeOptions,
};
use crate::config::CaptureConfig;
use crate::resource::parse_target_url;
use crate::types::{AssetBundle, BreakpointCapture, PageMetadata, PageSnapshot};
use crate::viewport::{Breakpoint, Viewport};
use crate::{PclError, Result};

pub use assets::build_asset_bundle;

pub struct SnapshotCapturer {
    driver: Arc<dyn PageDriver>,
    config: CaptureConfig,
    policy: NavigationPolicy,
}

impl SnapshotCapturer {
    pub fn new(driver: Arc<dyn PageDriver>, config: CaptureConfig, policy: NavigationPolicy) -> Self {
        Self {
            driver,
            config,
            policy,
        }
    }

    fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_depth: self.config.max_depth,
            markup_limit: self.config.markup_limit,
            html_limit: self.config.html_limit,
        }
    }

    /// Capture `url` at every breakpoint. The page context is closed on
    /// success and on failure.
    pub async fn capture(&self, url: &str) -> Result<PageSnapshot> {
        let url = parse_target_url(url)?.to_string();
        let viewport = self
            .config
            .breakpoints
            .viewport(Breakpoint::Desktop, self.config.viewport_height);

        let mut ctx = self.driver.open_context(viewport).await?;
        let result = self.capture_in(ctx.as_mut(), &url).await;
        if let Err(err) = ctx.close().await {
            warn!(error = %err, "failed to close capture context");
        }
        result
    }

    async fn capture_in(&self, ctx: &mut dyn PageContext, url: &str) -> Result<PageSnapshot> {
        let strategy = navigate_with_fallback(&mut *ctx, url, &self.policy).await?;
        debug!(url, strategy = %strategy, "page loaded");
        let mut warnings = Vec::new();

        if let Err(err) = ctx
            .scroll_lazy_content(self.config.scroll_step_px, self.config.scroll_pause)
            .await
        {
            warn!(error = %err, "lazy-content scroll failed");
            warnings.push(format!("lazy-content scroll failed: {err}"));
        }
        tokio::time::sleep(self.config.lazy_settle).await;

        let mut captures = Vec::with_capacity(3);
        for (breakpoint, width) in self.config.breakpoints.ordered() {
            let viewport = Viewport {
                width,
                height: self.config.viewport_height,
            };
            ctx.set_viewport(viewport)
                .await
                .map_err(|e| PclError::capture(format!("{breakpoint} breakpoint: {e}")))?;
            tokio::time::sleep(self.config.reflow_delay).await;
            let raw = ctx
                .capture_tree(self.tree_options())
                .await
                .map_err(|e| PclError::capture(format!("{breakpoint} breakpoint: {e}")))?;
            captures.push(self.assemble(breakpoint, width, raw, &mut warnings)?);
        }

        let (metadata, assets) = match ctx.harvest_assets().await {
            Ok(raw) => {
                let metadata = raw.metadata.clone();
                let (bundle, harvest_warnings) = build_asset_bundle(raw, url);
                warnings.extend(harvest_warnings);
                (metadata, bundle)
            }
            Err(err) => {
                warn!(error = %err, "asset harvest failed; continuing without assets");
                warnings.push(format!("asset harvest failed: {err}"));
                (PageMetadata::default(), AssetBundle::default())
            }
        };

        let mut seen = HashSet::new();
        warnings.retain(|w| seen.insert(w.clone()));
        for warning in &warnings {
            debug!(warning = %warning, "capture degraded");
        }

        info!(
            url,
            breakpoints = captures.len(),
            assets = assets.total(),
            warnings = warnings.len(),
            "snapshot captured"
        );
        Ok(PageSnapshot {
            url: url.to_string(),
            metadata,
            captures,
            assets,
            warnings,
        })
    }

    fn assemble(
        &self,
        breakpoint: Breakpoint,
        width: u32,
        raw: RawTree,
        warnings: &mut Vec<String>,
    ) -> Result<BreakpointCapture> {
        let node_count = raw.nodes.len();
        warnings.extend(raw.warnings);
        if raw.truncated > 0 {
            warnings.push(format!(
                "{breakpoint}: {} branches deeper than {} levels were truncated",
                raw.truncated, self.config.max_depth
            ));
        }
        let root = build_tree(raw.nodes, self.config.max_depth).ok_or_else(|| {
            PclError::capture(format!("{breakpoint} breakpoint: page has no body element"))
        })?;
        debug!(%breakpoint, width, nodes = node_count, "breakpoint captured");
        Ok(BreakpointCapture {
            breakpoint,
            viewport_width: width,
            root,
            html: raw.html,
            css: raw.css,
        })
    }
}
