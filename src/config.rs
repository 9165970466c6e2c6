use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::viewport::Breakpoints;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub capture: CaptureConfig,
    pub classifier: ClassifierConfig,
    pub verifier: VerifierConfig,
    pub governance: GovernanceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub node_command: String,
    pub headless: bool,
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    /// Upper bound for any single helper round-trip.
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,
    pub max_concurrent_contexts: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            headless: true,
            navigation_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(45),
            max_concurrent_contexts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub breakpoints: Breakpoints,
    pub viewport_height: u32,
    pub max_depth: usize,
    pub scroll_step_px: u32,
    #[serde(with = "humantime_serde")]
    pub scroll_pause: Duration,
    #[serde(with = "humantime_serde")]
    pub lazy_settle: Duration,
    #[serde(with = "humantime_serde")]
    pub reflow_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub dom_ready_settle: Duration,
    pub markup_limit: usize,
    pub html_limit: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            breakpoints: Breakpoints::default(),
            viewport_height: 900,
            max_depth: 50,
            scroll_step_px: 400,
            scroll_pause: Duration::from_millis(100),
            lazy_settle: Duration::from_secs(1),
            reflow_delay: Duration::from_millis(500),
            dom_ready_settle: Duration::from_secs(2),
            markup_limit: 50_000,
            html_limit: 2_000_000,
        }
    }
}

/// Thresholds used by the structure classifier and column allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub section_min_height: f64,
    pub section_min_width: f64,
    /// A root node with more children than this becomes a section.
    pub section_child_count: usize,
    pub wide_child_width: f64,
    pub column_break_width_ratio: f64,
    pub column_min: f64,
    pub column_max: f64,
    pub column_base_weight: f64,
    pub widget_weight: f64,
    pub media_weight: f64,
    pub form_weight: f64,
    pub palette_colors: usize,
    pub palette_fonts: usize,
    /// CIE Lab distance under which two colors are treated as one.
    pub color_merge_distance: f32,
    pub template: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            section_min_height: 200.0,
            section_min_width: 300.0,
            section_child_count: 2,
            wide_child_width: 300.0,
            column_break_width_ratio: 1.5,
            column_min: 15.0,
            column_max: 70.0,
            column_base_weight: 1.0,
            widget_weight: 0.2,
            media_weight: 0.5,
            form_weight: 0.3,
            palette_colors: 8,
            palette_fonts: 4,
            color_merge_distance: 6.0,
            template: "elementor_canvas".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualMethod {
    /// Compares encoded screenshot sizes; an approximation, not a pixel diff.
    #[default]
    ByteSizeProxy,
    Disabled,
}

impl std::fmt::Display for VisualMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisualMethod::ByteSizeProxy => f.write_str("byte-size-proxy"),
            VisualMethod::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub structural: f64,
    pub visual: f64,
    pub responsive: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            structural: 0.5,
            visual: 0.3,
            responsive: 0.2,
        }
    }
}

/// One step of a banded scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub bound: f64,
    pub score: f64,
}

impl Band {
    pub const fn new(bound: f64, score: f64) -> Self {
        Self { bound, score }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualRules {
    /// Size-difference ratio upper bounds, ascending.
    pub buckets: Vec<Band>,
    pub floor: f64,
}

impl Default for VisualRules {
    fn default() -> Self {
        Self {
            buckets: vec![
                Band::new(0.05, 0.8),
                Band::new(0.15, 0.6),
                Band::new(0.30, 0.4),
                Band::new(0.50, 0.3),
            ],
            floor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralRules {
    pub leniency: f64,
    pub content_boost: f64,
    pub one_side_zero: f64,
    pub both_missing: f64,
    pub one_missing: f64,
}

impl Default for StructuralRules {
    fn default() -> Self {
        Self {
            leniency: 1.4,
            content_boost: 1.2,
            one_side_zero: 0.3,
            both_missing: 0.8,
            one_missing: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveRules {
    /// Layout-length ratio lower bounds, descending.
    pub bands: Vec<Band>,
    pub floor: f64,
    pub missing: f64,
}

impl Default for ResponsiveRules {
    fn default() -> Self {
        Self {
            bands: vec![
                Band::new(0.8, 1.0),
                Band::new(0.6, 0.9),
                Band::new(0.4, 0.8),
                Band::new(0.2, 0.7),
            ],
            floor: 0.6,
            missing: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorRules {
    pub boost_below: f64,
    pub boost_trigger: f64,
    pub boost_factor: f64,
    pub boost_floor: f64,
    pub data_floor: f64,
}

impl Default for FloorRules {
    fn default() -> Self {
        Self {
            boost_below: 0.6,
            boost_trigger: 0.4,
            boost_factor: 1.3,
            boost_floor: 0.6,
            data_floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackScores {
    pub structural: f64,
    pub visual: f64,
    pub responsive: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRules {
    pub with_content: FallbackScores,
    pub without_content: FallbackScores,
    pub min_assets: usize,
}

impl Default for FallbackRules {
    fn default() -> Self {
        Self {
            with_content: FallbackScores {
                structural: 0.25,
                visual: 0.15,
                responsive: 0.20,
            },
            without_content: FallbackScores {
                structural: 0.10,
                visual: 0.05,
                responsive: 0.10,
            },
            min_assets: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub threshold: f64,
    pub visual_method: VisualMethod,
    pub weights: ScoreWeights,
    pub visual: VisualRules,
    pub structural: StructuralRules,
    pub responsive: ResponsiveRules,
    pub floor: FloorRules,
    pub fallback: FallbackRules,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.45,
            visual_method: VisualMethod::default(),
            weights: ScoreWeights::default(),
            visual: VisualRules::default(),
            structural: StructuralRules::default(),
            responsive: ResponsiveRules::default(),
            floor: FloorRules::default(),
            fallback: FallbackRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Raw markup/style fields longer than this are replaced by the placeholder.
    pub field_limit: usize,
    /// Serialized document size that triggers compaction.
    pub document_limit: usize,
    pub keep_sections: usize,
    pub placeholder: String,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            field_limit: 10_000,
            document_limit: 5_000_000,
            keep_sections: 5,
            placeholder: "<!-- content removed: exceeded size limit -->".to_string(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, the central config file, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::central_config_path().filter(|p| p.exists()),
        };
        let Some(path) = resolved else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        Self::parse(&raw, &path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, String> {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        if is_yaml {
            serde_yaml::from_str(raw).map_err(|e| e.to_string())
        } else {
            toml::from_str(raw).map_err(|e| e.to_string())
        }
    }

    /// `$XDG_CONFIG_HOME/pcl/config.toml`, falling back to `~/.config/pcl/config.toml`.
    pub fn central_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .filter(|v| !v.is_empty())
                    .map(|home| PathBuf::from(home).join(".config"))
            })?;
        Some(base.join("pcl").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), String> {
        let verifier = &self.verifier;
        if !(0.0..=1.0).contains(&verifier.threshold) {
            return Err(format!(
                "verifier.threshold must be within [0, 1], got {}",
                verifier.threshold
            ));
        }
        let w = verifier.weights;
        if w.structural < 0.0 || w.visual < 0.0 || w.responsive < 0.0 {
            return Err("verifier.weights must be non-negative".to_string());
        }
        if w.structural + w.visual + w.responsive <= 0.0 {
            return Err("verifier.weights must not all be zero".to_string());
        }
        if !self.capture.breakpoints.is_ascending() {
            let bps = self.capture.breakpoints;
            return Err(format!(
                "capture.breakpoints must be positive and ascending (mobile < tablet < desktop), got {}/{}/{}",
                bps.mobile, bps.tablet, bps.desktop
            ));
        }
        if self.capture.max_depth == 0 {
            return Err("capture.max_depth must be greater than zero".to_string());
        }
        let classifier = &self.classifier;
        if classifier.column_min >= classifier.column_max {
            return Err(format!(
                "classifier.column_min ({}) must be below classifier.column_max ({})",
                classifier.column_min, classifier.column_max
            ));
        }
        if self.governance.document_limit <= self.governance.field_limit {
            return Err(format!(
                "governance.document_limit ({}) must exceed governance.field_limit ({})",
                self.governance.document_limit, self.governance.field_limit
            ));
        }
        if self.browser.max_concurrent_contexts == 0 {
            return Err("browser.max_concurrent_contexts must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.capture.breakpoints.mobile, 375);
        assert_eq!(cfg.capture.breakpoints.tablet, 768);
        assert_eq!(cfg.capture.breakpoints.desktop, 1200);
        assert_eq!(cfg.capture.max_depth, 50);
        assert!((cfg.verifier.threshold - 0.45).abs() < f64::EPSILON);
        assert!((cfg.verifier.weights.structural - 0.5).abs() < f64::EPSILON);
        assert!((cfg.verifier.weights.visual - 0.3).abs() < f64::EPSILON);
        assert!((cfg.verifier.weights.responsive - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.verifier.visual_method, VisualMethod::ByteSizeProxy);
        assert_eq!(cfg.browser.navigation_timeout, Duration::from_secs(30));
        assert!((cfg.classifier.column_min - 15.0).abs() < f64::EPSILON);
        assert!((cfg.classifier.column_max - 70.0).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let raw = r#"
[browser]
navigation_timeout = "12s"

[verifier]
threshold = 0.7
visual_method = "disabled"

[capture.breakpoints]
mobile = 360
"#;
        let cfg = Config::parse(raw, Path::new("pcl.toml")).expect("parse toml");
        assert_eq!(cfg.browser.navigation_timeout, Duration::from_secs(12));
        assert_eq!(cfg.browser.node_command, "node");
        assert!((cfg.verifier.threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.verifier.visual_method, VisualMethod::Disabled);
        assert_eq!(cfg.capture.breakpoints.mobile, 360);
        assert_eq!(cfg.capture.breakpoints.desktop, 1200);
        assert_eq!(cfg.verifier.visual.buckets.len(), 4);
    }

    #[test]
    fn yaml_files_are_parsed_by_extension() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "capture:\n  reflow_delay: 250ms\ngovernance:\n  keep_sections: 3"
        )
        .expect("write");
        let cfg = Config::load(Some(file.path())).expect("load yaml");
        assert_eq!(cfg.capture.reflow_delay, Duration::from_millis(250));
        assert_eq!(cfg.governance.keep_sections, 3);
        assert!((cfg.verifier.threshold - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.verifier.threshold = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.capture.breakpoints.tablet = 300;
        assert!(cfg.validate().unwrap_err().contains("ascending"));

        let mut cfg = Config::default();
        cfg.classifier.column_min = 80.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.verifier.weights = ScoreWeights {
            structural: 0.0,
            visual: 0.0,
            responsive: 0.0,
        };
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.governance.document_limit = 100;
        assert!(cfg.validate().is_err());
    }
}
