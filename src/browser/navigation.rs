use std::time::Duration;

use tracing::{info, warn};

use super::driver::{PageContext, WaitStrategy};
use crate::config::{BrowserConfig, CaptureConfig};
use crate::{PclError, Result};

#[derive(Debug, Clone)]
pub struct NavigationPolicy {
    pub strategies: Vec<WaitStrategy>,
    pub timeout: Duration,
    /// Fixed delay after `DOMContentLoaded` for the last-resort strategy.
    pub dom_ready_settle: Duration,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default(), &CaptureConfig::default())
    }
}

impl NavigationPolicy {
    pub fn from_config(browser: &BrowserConfig, capture: &CaptureConfig) -> Self {
        Self {
            strategies: WaitStrategy::cascade().to_vec(),
            timeout: browser.navigation_timeout,
            dom_ready_settle: capture.dom_ready_settle,
        }
    }
}

/// Navigate with each wait strategy in turn, returning the first that loads.
///
/// Configuration problems (missing Node/Playwright) are not navigation
/// failures and are returned immediately.
pub async fn navigate_with_fallback(
    ctx: &mut dyn PageContext,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<WaitStrategy> {
    let mut attempted = Vec::with_capacity(policy.strategies.len());
    let mut last_error = String::from("no wait strategy configured");

    for strategy in &policy.strategies {
        let settle = match strategy {
            WaitStrategy::DomReady => policy.dom_ready_settle,
            _ => Duration::ZERO,
        };
        attempted.push(*strategy);
        match ctx.navigate(url, *strategy, policy.timeout, settle).await {
            Ok(()) => {
                info!(url, strategy = %strategy, "navigation succeeded");
                return Ok(*strategy);
            }
            Err(err @ PclError::Config(_)) => return Err(err),
            Err(err) => {
                warn!(url, strategy = %strategy, error = %err, "navigation attempt failed");
                last_error = err.to_string();
            }
        }
    }

    Err(PclError::Navigation {
        url: url.to_string(),
        attempted,
        message: last_error,
    })
}
