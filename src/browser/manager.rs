//! Browser manager for the shared headless browser helper.
//!
//! The helper process is started lazily on the first context request,
//! reused by every later request, and respawned if it died. Context creation
//! is serialized; the number of open contexts is bounded by a semaphore.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedSemaphorePermit, RwLock, Semaphore};
use tracing::{debug, info, warn};

use super::driver::{PageContext, PageDriver, TreeOptions, WaitStrategy};
use super::playwright::{ensure_node_available, ensure_playwright_available};
use super::process::{DriverProcess, DriverRequest};
use super::raw::{RawAssets, RawLayout, RawTree};
use crate::config::BrowserConfig;
use crate::{PclError, Result, Viewport};

/// Slack added on top of navigation time when bounding a navigate call.
const NAVIGATION_SLACK: Duration = Duration::from_secs(5);

/// Configuration options for the browser helper.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for a single navigation attempt.
    pub navigation_timeout: Duration,
    /// Timeout for any other helper round-trip.
    pub operation_timeout: Duration,
    /// Maximum number of simultaneously open page contexts.
    pub max_concurrent_contexts: usize,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        BrowserConfig::default().into()
    }
}

impl From<BrowserConfig> for BrowserOptions {
    fn from(cfg: BrowserConfig) -> Self {
        Self {
            node_command: cfg.node_command,
            headless: cfg.headless,
            navigation_timeout: cfg.navigation_timeout,
            operation_timeout: cfg.operation_timeout,
            max_concurrent_contexts: cfg.max_concurrent_contexts,
        }
    }
}

struct ManagerInner {
    options: BrowserOptions,
    process: RwLock<Option<Arc<DriverProcess>>>,
    context_gate: Mutex<()>,
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
}

/// Owns the shared helper process; cheap to clone.
#[derive(Clone)]
pub struct BrowserManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for BrowserManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserManager")
            .field("options", &self.inner.options)
            .field("active_contexts", &self.active_contexts())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenedContext {
    context_id: u64,
}

impl BrowserManager {
    /// Creates a new BrowserManager with the given options. Nothing is spawned yet.
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_contexts.max(1);
        Self {
            inner: Arc::new(ManagerInner {
                options,
                process: RwLock::new(None),
                context_gate: Mutex::new(()),
                semaphore: Arc::new(Semaphore::new(permits)),
                active: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.inner.options
    }

    /// Running helper, started (or restarted) on demand.
    async fn acquire(&self) -> Result<Arc<DriverProcess>> {
        if let Some(process) = self.inner.process.read().await.as_ref() {
            if process.is_alive() {
                return Ok(process.clone());
            }
        }

        let mut slot = self.inner.process.write().await;
        if let Some(process) = slot.as_ref() {
            if process.is_alive() {
                return Ok(process.clone());
            }
            warn!("browser helper died; restarting");
        }

        let node = &self.inner.options.node_command;
        ensure_node_available(node).await?;
        ensure_playwright_available(node).await?;
        let process = Arc::new(DriverProcess::spawn(&self.inner.options).await?);
        info!("browser helper ready");
        *slot = Some(process.clone());
        Ok(process)
    }
}

#[async_trait]
impl PageDriver for BrowserManager {
    async fn open_context(&self, viewport: Viewport) -> Result<Box<dyn PageContext>> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PclError::browser("Browser manager unavailable"))?;
        let process = self.acquire().await?;

        let opened = {
            let _gate = self.inner.context_gate.lock().await;
            process
                .call(
                    DriverRequest::OpenContext {
                        width: viewport.width,
                        height: viewport.height,
                    },
                    self.inner.options.operation_timeout,
                )
                .await?
        };
        let opened: OpenedContext = serde_json::from_value(opened)?;
        self.inner.active.fetch_add(1, Ordering::SeqCst);
        debug!(context = opened.context_id, %viewport, "page context opened");

        Ok(Box::new(BrowserContext {
            id: opened.context_id,
            process,
            options: self.inner.options.clone(),
            active: self.inner.active.clone(),
            _permit: permit,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let process = self.inner.process.write().await.take();
        if let Some(process) = process {
            process.stop().await;
            info!("browser helper stopped");
        }
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }
}

/// One page inside the shared helper.
struct BrowserContext {
    id: u64,
    process: Arc<DriverProcess>,
    options: BrowserOptions,
    active: Arc<AtomicUsize>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserContext {
    async fn call(&self, request: DriverRequest) -> Result<serde_json::Value> {
        self.process
            .call(request, self.options.operation_timeout)
            .await
    }
}

#[async_trait]
impl PageContext for BrowserContext {
    async fn navigate(
        &mut self,
        url: &str,
        strategy: WaitStrategy,
        timeout: Duration,
        settle: Duration,
    ) -> Result<()> {
        let bound = self
            .options
            .operation_timeout
            .max(timeout + settle + NAVIGATION_SLACK);
        self.process
            .call(
                DriverRequest::Navigate {
                    context_id: self.id,
                    url: url.to_string(),
                    strategy,
                    timeout_ms: timeout.as_millis() as u64,
                    settle_ms: settle.as_millis() as u64,
                },
                bound,
            )
            .await?;
        Ok(())
    }

    async fn set_content(&mut self, html: &str) -> Result<()> {
        self.call(DriverRequest::SetContent {
            context_id: self.id,
            html: html.to_string(),
            timeout_ms: self.options.navigation_timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.call(DriverRequest::SetViewport {
            context_id: self.id,
            width: viewport.width,
            height: viewport.height,
        })
        .await?;
        Ok(())
    }

    async fn scroll_lazy_content(&mut self, step_px: u32, pause: Duration) -> Result<()> {
        self.call(DriverRequest::ScrollLazy {
            context_id: self.id,
            step_px: step_px.max(1),
            pause_ms: pause.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn capture_tree(&mut self, options: TreeOptions) -> Result<RawTree> {
        let value = self
            .call(DriverRequest::CaptureTree {
                context_id: self.id,
                options,
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn harvest_assets(&mut self) -> Result<RawAssets> {
        let value = self
            .call(DriverRequest::HarvestAssets {
                context_id: self.id,
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn capture_layout(&mut self, screenshot_path: Option<&Path>) -> Result<RawLayout> {
        let value = self
            .call(DriverRequest::CaptureLayout {
                context_id: self.id,
                screenshot_path: screenshot_path.map(|p| p.to_string_lossy().to_string()),
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let result = self
            .call(DriverRequest::CloseContext {
                context_id: self.id,
            })
            .await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!(context = self.id, "page context closed");
        result.map(|_| ())
    }
}
