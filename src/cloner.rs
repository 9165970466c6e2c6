//! Request orchestration: scrape, classify, govern and verify, in that order.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::browser::{NavigationPolicy, PageDriver};
use crate::capture::SnapshotCapturer;
use crate::classify::{govern, GovernanceReport, TemplateBuilder};
use crate::config::Config;
use crate::progress::{Phase, ProgressCallback, ProgressReporter};
use crate::resource::parse_target_url;
use crate::types::{FidelityReport, PageSnapshot, TemplateDocument};
use crate::verify::FidelityVerifier;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneRequest {
    pub url: String,
    #[serde(default)]
    pub skip_verification: bool,
}

impl CloneRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            skip_verification: false,
        }
    }

    pub fn skip_verification(mut self, skip: bool) -> Self {
        self.skip_verification = skip;
        self
    }
}

/// What the caller may do with a result that did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryAdvice {
    pub retryable: bool,
    /// Re-running with verification skipped returns the document as-is.
    pub skip_verification: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Verdict {
    Accepted,
    Skipped,
    NeedsReview { reason: String, retry: RetryAdvice },
}

impl Verdict {
    pub fn from_report(report: &FidelityReport) -> Self {
        if report.passed {
            return Verdict::Accepted;
        }
        let reason = match &report.details.fallback {
            Some(fallback) => format!("verification could not complete: {}", fallback.reason),
            None => format!(
                "fidelity score {:.2} is below the threshold {:.2}",
                report.fidelity_score, report.details.threshold
            ),
        };
        Verdict::NeedsReview {
            reason,
            retry: RetryAdvice {
                retryable: true,
                skip_verification: true,
            },
        }
    }

    pub fn needs_review(&self) -> bool {
        matches!(self, Verdict::NeedsReview { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneResult {
    pub template: TemplateDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<FidelityReport>,
    pub governance: GovernanceReport,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub struct CloneService {
    driver: Arc<dyn PageDriver>,
    config: Config,
    artifacts_dir: Option<PathBuf>,
    keep_artifacts: bool,
}

impl CloneService {
    pub fn new(driver: Arc<dyn PageDriver>, config: Config) -> Self {
        Self {
            driver,
            config,
            artifacts_dir: None,
            keep_artifacts: false,
        }
    }

    pub fn with_artifacts(mut self, dir: Option<PathBuf>, keep: bool) -> Self {
        self.artifacts_dir = dir;
        self.keep_artifacts = keep;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn policy(&self) -> NavigationPolicy {
        NavigationPolicy::from_config(&self.config.browser, &self.config.capture)
    }

    /// Clone one page. Only a failed scrape is an error; everything after it
    /// degrades into the result.
    pub async fn run(
        &self,
        request: CloneRequest,
        progress: Option<ProgressCallback>,
    ) -> Result<CloneResult> {
        let reporter = ProgressReporter::new(progress);
        reporter.phase(Phase::Starting);
        let url = parse_target_url(&request.url)?.to_string();

        reporter.phase(Phase::Scraping);
        let capturer = SnapshotCapturer::new(
            self.driver.clone(),
            self.config.capture.clone(),
            self.policy(),
        );
        let snapshot = capturer.capture(&url).await?;
        reporter.phase(Phase::Scraped);

        Ok(self
            .finish(snapshot, request.skip_verification, &reporter)
            .await)
    }

    /// Run everything after the scrape on a stored snapshot.
    pub async fn run_snapshot(
        &self,
        snapshot: PageSnapshot,
        skip_verification: bool,
        progress: Option<ProgressCallback>,
    ) -> CloneResult {
        let reporter = ProgressReporter::new(progress);
        reporter.phase(Phase::Scraped);
        self.finish(snapshot, skip_verification, &reporter).await
    }

    async fn finish(
        &self,
        snapshot: PageSnapshot,
        skip_verification: bool,
        reporter: &ProgressReporter,
    ) -> CloneResult {
        reporter.phase(Phase::Converting);
        let mut template =
            TemplateBuilder::new(self.config.classifier.clone(), self.config.capture.breakpoints)
                .build(&snapshot);
        let governance = govern(&mut template, &self.config.governance);
        if governance.triggered() {
            info!(
                cleaned = governance.cleaned_fields,
                compacted = governance.compacted,
                truncated = governance.truncated_sections,
                bytes = governance.final_bytes,
                "size governance applied"
            );
        }
        reporter.phase(Phase::Converted);

        if skip_verification {
            reporter.phase(Phase::Complete);
            return CloneResult {
                template,
                fidelity: None,
                governance,
                verdict: Verdict::Skipped,
                warnings: snapshot.warnings,
            };
        }

        reporter.phase(Phase::Verifying);
        let verifier = FidelityVerifier::new(
            self.driver.clone(),
            self.config.verifier.clone(),
            self.config.capture.clone(),
            self.policy(),
        )
        .with_artifacts(self.artifacts_dir.clone(), self.keep_artifacts);
        let report = verifier.verify(&snapshot.url, &snapshot, &template).await;
        template.metadata.fidelity_score = Some(report.fidelity_score);
        reporter.phase(Phase::Verified);

        let verdict = Verdict::from_report(&report);
        if let Verdict::NeedsReview { reason, .. } = &verdict {
            warn!(url = %snapshot.url, reason = %reason, "clone needs review");
        }
        reporter.phase(Phase::Complete);
        CloneResult {
            template,
            fidelity: Some(report),
            governance,
            verdict,
            warnings: snapshot.warnings,
        }
    }
}
