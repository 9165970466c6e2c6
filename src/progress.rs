use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub phase: String,
    pub progress: u8,
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Named phase boundaries of a clone request, with their percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Scraping,
    Scraped,
    Converting,
    Converted,
    Verifying,
    Verified,
    Complete,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Starting => "starting",
            Phase::Scraping => "scraping",
            Phase::Scraped => "scraped",
            Phase::Converting => "converting",
            Phase::Converted => "converted",
            Phase::Verifying => "verifying",
            Phase::Verified => "verified",
            Phase::Complete => "complete",
        }
    }

    pub fn percent(&self) -> u8 {
        match self {
            Phase::Starting => 0,
            Phase::Scraping => 5,
            Phase::Scraped => 40,
            Phase::Converting => 45,
            Phase::Converted => 60,
            Phase::Verifying => 65,
            Phase::Verified => 95,
            Phase::Complete => 100,
        }
    }
}

/// Fire-and-forget progress sink. Values are clamped to [0, 100] and never
/// move backwards; a missing callback only logs.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    last: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn phase(&self, phase: Phase) {
        self.report(phase.name(), phase.percent());
    }

    pub fn report(&self, phase: &str, progress: u8) {
        let requested = progress.min(100);
        let previous = self.last.fetch_max(requested, Ordering::SeqCst);
        let effective = previous.max(requested);
        info!(phase, progress = effective, "progress");
        if let Some(cb) = &self.callback {
            cb(&ProgressEvent {
                phase: phase.to_string(),
                progress: effective,
            });
        }
    }

    pub fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .field("last", &self.current())
            .finish()
    }
}
