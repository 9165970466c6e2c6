use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::classify::GovernanceReport;
use crate::cloner::{CloneResult, Verdict};
use crate::error::ErrorPayload;
use crate::types::{FidelityReport, LayoutCounts, PageSnapshot, TemplateDocument};

/// Schema version for output payloads.
pub const PCL_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PclOutput {
    Clone(CloneOutput),
    Capture(CaptureOutput),
    Convert(ConvertOutput),
    Error(ErrorOutput),
}

impl PclOutput {
    pub fn mode(&self) -> &'static str {
        match self {
            PclOutput::Clone(_) => "clone",
            PclOutput::Capture(_) => "capture",
            PclOutput::Convert(_) => "convert",
            PclOutput::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneOutput {
    pub version: String,
    pub url: String,
    pub verdict: Verdict,
    pub counts: LayoutCounts,
    pub template: TemplateDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<FidelityReport>,
    pub governance: GovernanceReport,
    /// Where `--document-out` wrote the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CloneOutput {
    pub fn from_result(url: impl Into<String>, result: CloneResult) -> Self {
        Self {
            version: PCL_OUTPUT_VERSION.to_string(),
            url: url.into(),
            counts: result.template.counts(),
            verdict: result.verdict,
            template: result.template,
            fidelity: result.fidelity,
            governance: result.governance,
            document_path: None,
            artifacts_dir: None,
            warnings: result.warnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub snapshot: PageSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOutput {
    pub version: String,
    pub source: PathBuf,
    pub counts: LayoutCounts,
    pub template: TemplateDocument,
    pub governance: GovernanceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
