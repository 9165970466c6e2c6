use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::WaitStrategy;

#[derive(Debug, Error)]
pub enum PclError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Navigation to {url} failed after trying {}: {message}", format_strategies(.attempted))]
    Navigation {
        url: String,
        attempted: Vec<WaitStrategy>,
        message: String,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

fn format_strategies(attempted: &[WaitStrategy]) -> String {
    if attempted.is_empty() {
        return "no wait strategy".to_string();
    }
    attempted
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl PclError {
    pub fn browser(message: impl Into<String>) -> Self {
        PclError::Browser(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        PclError::Capture(message.into())
    }

    /// True for the one failure class allowed to abort a clone request.
    pub fn is_navigation(&self) -> bool {
        matches!(self, PclError::Navigation { .. })
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            PclError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check file paths/permissions.",
            ),
            PclError::InvalidUrl { .. } => ErrorPayload::new(
                ErrorCategory::Config,
                self.to_string(),
                "Pass an absolute http(s) URL (e.g., https://example.com).",
            ),
            PclError::Navigation { .. } => ErrorPayload::new(
                ErrorCategory::Navigation,
                self.to_string(),
                "Check that the host is reachable; try increasing --nav-timeout and retry.",
            ),
            PclError::Browser(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("timed out") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Try increasing --process-timeout/--nav-timeout, or retry with --skip-verification.",
                    )
                } else if lower.contains("exited") {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "The browser helper stopped; re-run with --verbose to see its stderr.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Browser,
                        msg.to_string(),
                        "Re-run with --verbose; ensure Chromium for Playwright is installed.",
                    )
                }
            }
            PclError::Capture(msg) => ErrorPayload::new(
                ErrorCategory::Capture,
                msg.to_string(),
                "The page could not be captured at every breakpoint; retry or lower --max-depth.",
            ),
            PclError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check JSON inputs (snapshots must come from `pcl capture`).",
            ),
            PclError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("chromium executable") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Run `npx playwright install chromium` to download the browser.",
                    )
                } else if lower.contains("browser helper")
                    || lower.contains("node command")
                    || lower.contains("not found on path")
                {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH (or pass --node-command).",
                    )
                } else if lower.contains("snapshot") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Point --snapshot (or PCL_MOCK_SNAPSHOT) at a JSON file written by `pcl capture`.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the config file (see --config).",
                    )
                }
            }
            PclError::Unknown(msg) => ErrorPayload::new(
                ErrorCategory::Unknown,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PclError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Navigation,
    Browser,
    Capture,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}
