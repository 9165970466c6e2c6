//! Fidelity verification: re-capture the original page, render the clone,
//! and score how closely they match.
//!
//! [`FidelityVerifier::verify`] never fails. Any error on the way to a score
//! (navigation, browser, unreadable screenshots) ends in a conservative
//! fallback report instead.
//!
//! # Module Structure
//!
//! - [`render`] - template document to standalone HTML
//! - [`visual`] - screenshot comparison strategies
//! - [`structural`] - element-count comparison
//! - [`responsive`] - per-breakpoint layout comparison
//! - [`scoring`] - weighting plus the floor and boost rules

pub mod render;
pub mod responsive;
pub mod scoring;
pub mod structural;
pub mod visual;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::browser::{navigate_with_fallback, NavigationPolicy, PageContext, PageDriver};
use crate::config::{CaptureConfig, VerifierConfig, VisualMethod};
use crate::types::{
    BreakpointFidelity, FallbackInfo, FidelityDetails, FidelityReport, LayoutCapture,
    PageSnapshot, ScreenshotInfo, TemplateDocument, VerifyStage,
};
use crate::viewport::{Breakpoint, Viewport};
use crate::Result;

pub use render::render_html;
pub use responsive::{LengthBandScorer, ResponsiveScorer};
pub use scoring::{overall_score, weighted_score, SubScores};
pub use structural::{compare_structural_fidelity, CountRatioScorer, StructuralScorer};
pub use visual::{compare_screenshots, ByteSizeProxy, VisualScorer};

/// What gets loaded into a verification page.
#[derive(Clone, Copy)]
enum PageSource<'a> {
    Url(&'a str),
    Markup(&'a str),
}

impl PageSource<'_> {
    fn prefix(&self) -> &'static str {
        match self {
            PageSource::Url(_) => "original",
            PageSource::Markup(_) => "clone",
        }
    }
}

/// Where screenshots are written for one verification run.
struct ArtifactDir {
    path: PathBuf,
    /// Created by this run, so it can be removed whole.
    owned: bool,
}

pub struct FidelityVerifier {
    driver: Arc<dyn PageDriver>,
    config: VerifierConfig,
    capture: CaptureConfig,
    policy: NavigationPolicy,
    artifacts_dir: Option<PathBuf>,
    keep_artifacts: bool,
    visual: Box<dyn VisualScorer>,
    structural: Box<dyn StructuralScorer>,
    responsive: Box<dyn ResponsiveScorer>,
}

impl FidelityVerifier {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        config: VerifierConfig,
        capture: CaptureConfig,
        policy: NavigationPolicy,
    ) -> Self {
        let visual = Box::new(ByteSizeProxy::new(config.visual.clone()));
        let structural = Box::new(CountRatioScorer::new(config.structural));
        let responsive = Box::new(LengthBandScorer::new(config.responsive.clone()));
        Self {
            driver,
            config,
            capture,
            policy,
            artifacts_dir: None,
            keep_artifacts: false,
            visual,
            structural,
            responsive,
        }
    }

    /// Write screenshots under `dir`. They are reported and left on disk
    /// only when `keep` is set.
    pub fn with_artifacts(mut self, dir: Option<PathBuf>, keep: bool) -> Self {
        self.artifacts_dir = dir;
        self.keep_artifacts = keep;
        self
    }

    pub fn with_visual_scorer(mut self, scorer: Box<dyn VisualScorer>) -> Self {
        self.visual = scorer;
        self
    }

    pub fn with_structural_scorer(mut self, scorer: Box<dyn StructuralScorer>) -> Self {
        self.structural = scorer;
        self
    }

    pub fn with_responsive_scorer(mut self, scorer: Box<dyn ResponsiveScorer>) -> Self {
        self.responsive = scorer;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    fn visual_method(&self) -> VisualMethod {
        match self.config.visual_method {
            VisualMethod::Disabled => VisualMethod::Disabled,
            VisualMethod::ByteSizeProxy => self.visual.method(),
        }
    }

    fn visual_enabled(&self) -> bool {
        self.visual_method() != VisualMethod::Disabled
    }

    /// Score `template` against the live page at `url`. `snapshot` is the
    /// scrape the template was built from; it only feeds the fallback path.
    pub async fn verify(
        &self,
        url: &str,
        snapshot: &PageSnapshot,
        template: &TemplateDocument,
    ) -> FidelityReport {
        let mut stages = vec![VerifyStage::Preparing];
        let artifacts = match self.prepare_artifacts().await {
            Ok(dir) => dir,
            Err(err) => return self.fallback(snapshot, stages, err.to_string()),
        };

        let outcome = self.run_stages(url, template, &artifacts, &mut stages).await;
        let report = match outcome {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    url,
                    stage = ?stages.last(),
                    error = %err,
                    "verification failed; using fallback scores"
                );
                self.fallback(snapshot, stages, err.to_string())
            }
        };

        if !self.keep_artifacts || report.is_fallback() {
            discard_artifacts(&artifacts).await;
        }
        report
    }

    async fn prepare_artifacts(&self) -> Result<ArtifactDir> {
        let (path, owned) = match &self.artifacts_dir {
            Some(dir) => (dir.clone(), false),
            None => {
                let suffix: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect();
                (std::env::temp_dir().join(format!("pcl-verify-{suffix}")), true)
            }
        };
        tokio::fs::create_dir_all(&path).await?;
        Ok(ArtifactDir { path, owned })
    }

    async fn run_stages(
        &self,
        url: &str,
        template: &TemplateDocument,
        artifacts: &ArtifactDir,
        stages: &mut Vec<VerifyStage>,
    ) -> Result<FidelityReport> {
        stages.push(VerifyStage::CapturingOriginal);
        let original = self.capture_side(PageSource::Url(url), &artifacts.path).await?;

        stages.push(VerifyStage::RenderingClone);
        let html = render_html(template);
        debug!(bytes = html.len(), "clone rendered to html");
        let clone = self.capture_side(PageSource::Markup(&html), &artifacts.path).await?;

        stages.push(VerifyStage::ScoringVisual);
        let mut notes = Vec::new();
        let per_breakpoint_visual = if self.visual_enabled() {
            notes.push(format!(
                "visual score uses {}: encoded screenshot sizes are compared, not pixels",
                self.visual.method()
            ));
            self.score_visual(&original, &clone).await?
        } else {
            notes.push("visual scoring disabled; its weight is shared by the other scores".into());
            vec![None; Breakpoint::all().len()]
        };
        let visual = self
            .visual_enabled()
            .then(|| visual::average_visual(&per_breakpoint_visual));

        stages.push(VerifyStage::ScoringStructural);
        let original_structure = find(&original, Breakpoint::Desktop).map(|c| c.counts);
        let clone_structure = find(&clone, Breakpoint::Desktop).map(|c| c.counts);
        let structural = self
            .structural
            .score(original_structure.as_ref(), clone_structure.as_ref());

        stages.push(VerifyStage::ScoringResponsive);
        let lengths: Vec<(Option<usize>, Option<usize>)> = Breakpoint::all()
            .iter()
            .map(|bp| {
                (
                    find(&original, *bp).map(|c| c.elements.len()),
                    find(&clone, *bp).map(|c| c.elements.len()),
                )
            })
            .collect();
        let responsive = self.responsive.score(&lengths);

        let breakpoints = Breakpoint::all()
            .iter()
            .zip(per_breakpoint_visual.iter())
            .zip(lengths.iter())
            .map(|((bp, visual), (o, c))| BreakpointFidelity {
                breakpoint: *bp,
                visual: *visual,
                responsive: self.responsive.score_breakpoint(*o, *c),
                original_elements: o.unwrap_or(0),
                clone_elements: c.unwrap_or(0),
                original_dimensions: find(&original, *bp).and_then(dimensions),
                clone_dimensions: find(&clone, *bp).and_then(dimensions),
            })
            .collect();

        let scores = SubScores {
            structural,
            visual,
            responsive,
        };
        let has_data = !original.is_empty() || !clone.is_empty();
        let fidelity_score =
            overall_score(&scores, &self.config.weights, &self.config.floor, has_data);
        stages.push(VerifyStage::Scored);

        let screenshots = self.keep_artifacts.then(|| screenshot_map(&original, &clone));
        let passed = fidelity_score >= self.config.threshold;
        info!(
            url,
            fidelity = fidelity_score,
            structural,
            responsive,
            passed,
            "fidelity scored"
        );

        Ok(FidelityReport {
            fidelity_score,
            visual_score: visual.unwrap_or(0.0),
            structural_score: structural,
            responsive_score: responsive,
            passed,
            details: FidelityDetails {
                stages: stages.clone(),
                visual_method: self.visual_method(),
                threshold: self.config.threshold,
                breakpoints,
                original_structure,
                clone_structure,
                fallback: None,
                notes,
            },
            screenshots,
        })
    }

    /// Load `source` in a fresh context and capture every breakpoint. The
    /// context is closed whatever the outcome.
    async fn capture_side(&self, source: PageSource<'_>, dir: &Path) -> Result<Vec<LayoutCapture>> {
        let viewport = self
            .capture
            .breakpoints
            .viewport(Breakpoint::Desktop, self.capture.viewport_height);
        let mut ctx = self.driver.open_context(viewport).await?;
        let result = self.capture_in(ctx.as_mut(), source, dir).await;
        if let Err(err) = ctx.close().await {
            warn!(side = source.prefix(), error = %err, "failed to close verification context");
        }
        result
    }

    async fn capture_in(
        &self,
        ctx: &mut dyn PageContext,
        source: PageSource<'_>,
        dir: &Path,
    ) -> Result<Vec<LayoutCapture>> {
        match source {
            PageSource::Url(url) => {
                navigate_with_fallback(&mut *ctx, url, &self.policy).await?;
            }
            PageSource::Markup(html) => ctx.set_content(html).await?,
        }

        let mut captures = Vec::with_capacity(3);
        for (breakpoint, width) in self.capture.breakpoints.ordered() {
            ctx.set_viewport(Viewport {
                width,
                height: self.capture.viewport_height,
            })
            .await?;
            tokio::time::sleep(self.capture.reflow_delay).await;

            let path = dir.join(format!("{}-{breakpoint}.png", source.prefix()));
            let layout = ctx.capture_layout(Some(&path)).await?;
            let screenshot = screenshot_info(&path).await;
            debug!(
                side = source.prefix(),
                %breakpoint,
                elements = layout.elements.len(),
                screenshot = screenshot.is_some(),
                "layout captured"
            );
            captures.push(LayoutCapture {
                breakpoint,
                viewport_width: width,
                elements: layout.elements,
                counts: layout.counts,
                screenshot,
            });
        }
        Ok(captures)
    }

    async fn score_visual(
        &self,
        original: &[LayoutCapture],
        clone: &[LayoutCapture],
    ) -> Result<Vec<Option<f64>>> {
        let mut scores = Vec::with_capacity(3);
        for bp in Breakpoint::all() {
            let pair = find(original, bp)
                .and_then(|c| c.screenshot.as_ref())
                .zip(find(clone, bp).and_then(|c| c.screenshot.as_ref()));
            let score = match pair {
                Some((a, b)) => {
                    let a = tokio::fs::read(&a.path).await?;
                    let b = tokio::fs::read(&b.path).await?;
                    Some(self.visual.score(&a, &b))
                }
                None => None,
            };
            scores.push(score);
        }
        Ok(scores)
    }

    fn fallback(
        &self,
        snapshot: &PageSnapshot,
        mut stages: Vec<VerifyStage>,
        reason: String,
    ) -> FidelityReport {
        let failed_stage = stages.last().copied().unwrap_or(VerifyStage::Preparing);
        let content_quality = content_quality(snapshot, self.config.fallback.min_assets);
        let fixed = if content_quality {
            self.config.fallback.with_content
        } else {
            self.config.fallback.without_content
        };
        let scores = SubScores::from_fallback(&fixed, self.visual_enabled());
        let fidelity_score =
            overall_score(&scores, &self.config.weights, &self.config.floor, false);
        stages.push(VerifyStage::FallbackScored);

        FidelityReport {
            fidelity_score,
            visual_score: scores.visual.unwrap_or(0.0),
            structural_score: scores.structural,
            responsive_score: scores.responsive,
            passed: fidelity_score >= self.config.threshold,
            details: FidelityDetails {
                stages,
                visual_method: self.visual_method(),
                threshold: self.config.threshold,
                breakpoints: Vec::new(),
                original_structure: None,
                clone_structure: None,
                fallback: Some(FallbackInfo {
                    reason,
                    failed_stage,
                    content_quality,
                }),
                notes: vec!["verification did not complete; scores are fixed fallbacks".into()],
            },
            screenshots: None,
        }
    }
}

/// Whether the scrape alone looks like a usable page: a primary tree with
/// children plus a title or enough harvested assets.
pub fn content_quality(snapshot: &PageSnapshot, min_assets: usize) -> bool {
    let structured = snapshot
        .primary()
        .is_some_and(|capture| !capture.root.children.is_empty());
    let has_title = !snapshot.metadata.title.trim().is_empty();
    structured && (has_title || snapshot.assets.total() >= min_assets)
}

fn find(captures: &[LayoutCapture], breakpoint: Breakpoint) -> Option<&LayoutCapture> {
    captures.iter().find(|c| c.breakpoint == breakpoint)
}

fn dimensions(capture: &LayoutCapture) -> Option<[u32; 2]> {
    let shot = capture.screenshot.as_ref()?;
    Some([shot.width?, shot.height?])
}

async fn screenshot_info(path: &Path) -> Option<ScreenshotInfo> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let (width, height) = match image::image_dimensions(path) {
        Ok((w, h)) => (Some(w), Some(h)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "screenshot header unreadable");
            (None, None)
        }
    };
    Some(ScreenshotInfo {
        path: path.to_path_buf(),
        bytes: meta.len(),
        width,
        height,
    })
}

fn screenshot_map(
    original: &[LayoutCapture],
    clone: &[LayoutCapture],
) -> BTreeMap<String, ScreenshotInfo> {
    let sides = [("original", original), ("clone", clone)];
    sides
        .iter()
        .flat_map(|(side, captures)| {
            captures.iter().filter_map(move |c| {
                c.screenshot
                    .clone()
                    .map(|shot| (format!("{side}-{}", c.breakpoint), shot))
            })
        })
        .collect()
}

async fn discard_artifacts(artifacts: &ArtifactDir) {
    if artifacts.owned {
        if let Err(err) = tokio::fs::remove_dir_all(&artifacts.path).await {
            debug!(path = %artifacts.path.display(), error = %err, "artifact cleanup failed");
        }
        return;
    }
    for side in ["original", "clone"] {
        for bp in Breakpoint::all() {
            let path = artifacts.path.join(format!("{side}-{bp}.png"));
            let _ = tokio::fs::remove_file(path).await;
        }
    }
}
