//! Browser automation for capturing live pages and rendering clones.
//!
//! A single long-lived Node.js helper drives Playwright's Chromium and talks
//! newline-delimited JSON over stdin/stdout. Pipeline code only sees the
//! [`PageDriver`] / [`PageContext`] traits, so tests can substitute scripted
//! drivers.
//!
//! # Module Structure
//!
//! - [`driver`] - driver traits and wait strategies
//! - [`manager`] - lazily started shared helper with context limiting
//! - [`navigation`] - the descending wait-strategy cascade
//! - [`playwright`] - helper script, error mapping and availability checks
//! - [`raw`] - raw page payloads and element tree reconstruction
//!
//! # Example
//!
//! ```no_run
//! use pcl_lib::browser::{BrowserManager, BrowserOptions, PageDriver};
//! use pcl_lib::Viewport;
//!
//! # async fn example() -> pcl_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let ctx = manager.open_context(Viewport::default()).await?;
//! ctx.close().await?;
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod manager;
pub mod navigation;
pub mod playwright;
mod process;
pub mod raw;

pub use driver::{OfflineDriver, PageContext, PageDriver, TreeOptions, WaitStrategy};
pub use manager::{BrowserManager, BrowserOptions};
pub use navigation::{navigate_with_fallback, NavigationPolicy};
pub use raw::{build_tree, RawAssets, RawLayout, RawNode, RawTree};
