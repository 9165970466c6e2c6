//! Page Cloner (PCL) Library
//!
//! Captures a live web page with a headless browser, rebuilds its rendered
//! structure as a section/column/widget page-builder document, and verifies
//! how faithfully the document reproduces the original.
//!
//! # Module Overview
//!
//! - [`browser`] - Shared headless browser helper and the page driver traits
//! - [`capture`] - Multi-breakpoint snapshot capture and asset harvesting
//! - [`classify`] - Structure classification and template assembly
//! - [`verify`] - Fidelity scoring with fallback reports
//! - [`cloner`] - The end-to-end clone request
//! - [`config`] - Configuration file support
//! - [`types`] - Snapshot, template and report data types
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pcl_lib::{BrowserManager, BrowserOptions, CloneRequest, CloneService, Config, PageDriver};
//!
//! # async fn example() -> pcl_lib::Result<()> {
//! let config = Config::default();
//! let manager = Arc::new(BrowserManager::new(config.browser.clone().into()));
//! let service = CloneService::new(manager.clone(), config);
//! let result = service.run(CloneRequest::new("https://example.com"), None).await?;
//! println!("{} sections", result.template.content.len());
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod classify;
pub mod cloner;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;
pub mod resource;
pub mod types;
pub mod verify;
pub mod viewport;

pub use browser::{
    navigate_with_fallback, BrowserManager, BrowserOptions, NavigationPolicy, OfflineDriver,
    PageContext, PageDriver, WaitStrategy,
};
pub use capture::SnapshotCapturer;
pub use classify::{build_template, govern, GovernanceReport, RuleChain, TemplateBuilder};
pub use cloner::{CloneRequest, CloneResult, CloneService, RetryAdvice, Verdict};
pub use config::Config;
pub use error::{ErrorCategory, ErrorPayload, PclError, Result};
pub use output::{
    CaptureOutput, CloneOutput, ConvertOutput, ErrorOutput, PclOutput, PCL_OUTPUT_VERSION,
};
pub use progress::{Phase, ProgressCallback, ProgressEvent, ProgressReporter};
pub use resource::{parse_snapshot_path, parse_target_url};
pub use types::{FidelityReport, PageSnapshot, TemplateDocument};
pub use verify::{compare_screenshots, compare_structural_fidelity, FidelityVerifier};
pub use viewport::{Breakpoint, Breakpoints, Viewport};
