use std::path::Path;
use std::time::Duration;

use pcl_lib::{Config, PclError};

use crate::cli::BrowserArgs;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct FlagSources {
    pub threshold: bool,
    pub nav_timeout: bool,
    pub process_timeout: bool,
    pub max_depth: bool,
    pub node_command: bool,
}

impl FlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            threshold: flag_present(args, "--threshold"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
            max_depth: flag_present(args, "--max-depth"),
            node_command: flag_present(args, "--node-command"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Merge CLI arguments into `config`, preferring CLI values only for flags
/// that were actually passed.
pub fn apply_overrides(
    config: &mut Config,
    browser: &BrowserArgs,
    threshold: Option<f64>,
    flags: &FlagSources,
) {
    if flags.threshold {
        if let Some(threshold) = threshold {
            config.verifier.threshold = threshold;
        }
    }
    if flags.nav_timeout {
        config.browser.navigation_timeout = Duration::from_secs(browser.nav_timeout);
    }
    if flags.process_timeout {
        config.browser.operation_timeout = Duration::from_secs(browser.process_timeout);
    }
    if flags.max_depth {
        config.capture.max_depth = browser.max_depth;
    }
    if flags.node_command {
        config.browser.node_command = browser.node_command.clone();
    }
}

/// Load config from a TOML/YAML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/pcl/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, PclError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        PclError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;
    validate(cfg, path)
}

/// Validate a config after CLI overrides have been applied.
pub fn validate(cfg: Config, path: Option<&Path>) -> Result<Config, PclError> {
    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        PclError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    let bp = config.capture.breakpoints;
    let w = config.verifier.weights;
    format!(
        "Effective config [{source}]: breakpoints={}/{}/{}, threshold={:.2}, timeouts: nav={}s, process={}s, max-depth={}, node={}, visual={}, weights: structural={:.2}, visual={:.2}, responsive={:.2}",
        bp.mobile,
        bp.tablet,
        bp.desktop,
        config.verifier.threshold,
        config.browser.navigation_timeout.as_secs(),
        config.browser.operation_timeout.as_secs(),
        config.capture.max_depth,
        config.browser.node_command,
        config.verifier.visual_method,
        w.structural,
        w.visual,
        w.responsive,
    )
}
