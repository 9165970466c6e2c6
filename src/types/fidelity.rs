use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::VisualMethod;
use crate::viewport::Breakpoint;

/// A lightweight per-element layout record used by the verifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutEntry {
    pub tag: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub display: String,
    pub position: String,
    pub font_size: String,
    pub color: String,
    pub background_color: String,
}

/// Coarse structural counts of a rendered page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructureCounts {
    pub total_elements: usize,
    pub text_nodes: usize,
    pub images: usize,
    pub sections: usize,
    pub containers: usize,
    pub headings: usize,
    pub links: usize,
}

impl StructureCounts {
    /// Category values in a fixed order, paired with their names.
    pub fn categories(&self) -> [(&'static str, usize); 7] {
        [
            ("totalElements", self.total_elements),
            ("textNodes", self.text_nodes),
            ("images", self.images),
            ("sections", self.sections),
            ("containers", self.containers),
            ("headings", self.headings),
            ("links", self.links),
        ]
    }

    pub fn has_meaningful_content(&self) -> bool {
        self.text_nodes > 0 || self.containers > 0 || self.images > 0 || self.headings > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotInfo {
    pub path: PathBuf,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// One side (original or clone) captured at one breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutCapture {
    pub breakpoint: Breakpoint,
    pub viewport_width: u32,
    pub elements: Vec<LayoutEntry>,
    pub counts: StructureCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<ScreenshotInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStage {
    Preparing,
    CapturingOriginal,
    RenderingClone,
    ScoringVisual,
    ScoringStructural,
    ScoringResponsive,
    Scored,
    FallbackScored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointFidelity {
    pub breakpoint: Breakpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<f64>,
    pub responsive: f64,
    pub original_elements: usize,
    pub clone_elements: usize,
    /// Screenshot `[width, height]` read from the PNG header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_dimensions: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_dimensions: Option<[u32; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackInfo {
    pub reason: String,
    pub failed_stage: VerifyStage,
    pub content_quality: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityDetails {
    pub stages: Vec<VerifyStage>,
    pub visual_method: VisualMethod,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<BreakpointFidelity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_structure: Option<StructureCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_structure: Option<StructureCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FidelityReport {
    pub fidelity_score: f64,
    pub visual_score: f64,
    pub structural_score: f64,
    pub responsive_score: f64,
    pub passed: bool,
    pub details: FidelityDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<BTreeMap<String, ScreenshotInfo>>,
}

impl FidelityReport {
    pub fn is_fallback(&self) -> bool {
        self.details.fallback.is_some()
    }
}
