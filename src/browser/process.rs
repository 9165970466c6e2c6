use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, warn};

use super::driver::{TreeOptions, WaitStrategy};
use super::manager::BrowserOptions;
use super::playwright::{map_reply_error, map_spawn_error, ReplyError, DRIVER_SCRIPT};
use crate::{PclError, Result};

/// Replies can carry whole page markup; keep the frame limit generous.
const MAX_REPLY_BYTES: usize = 256 * 1024 * 1024;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub(crate) enum DriverRequest {
    #[serde(rename_all = "camelCase")]
    OpenContext { width: u32, height: u32 },
    #[serde(rename_all = "camelCase")]
    CloseContext { context_id: u64 },
    #[serde(rename_all = "camelCase")]
    Navigate {
        context_id: u64,
        url: String,
        strategy: WaitStrategy,
        timeout_ms: u64,
        settle_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    SetContent {
        context_id: u64,
        html: String,
        timeout_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    SetViewport {
        context_id: u64,
        width: u32,
        height: u32,
    },
    #[serde(rename_all = "camelCase")]
    ScrollLazy {
        context_id: u64,
        step_px: u32,
        pause_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    CaptureTree {
        context_id: u64,
        #[serde(flatten)]
        options: TreeOptions,
    },
    #[serde(rename_all = "camelCase")]
    HarvestAssets { context_id: u64 },
    #[serde(rename_all = "camelCase")]
    CaptureLayout {
        context_id: u64,
        screenshot_path: Option<String>,
    },
    Shutdown,
}

impl DriverRequest {
    pub(crate) fn op(&self) -> &'static str {
        match self {
            DriverRequest::OpenContext { .. } => "openContext",
            DriverRequest::CloseContext { .. } => "closeContext",
            DriverRequest::Navigate { .. } => "navigate",
            DriverRequest::SetContent { .. } => "setContent",
            DriverRequest::SetViewport { .. } => "setViewport",
            DriverRequest::ScrollLazy { .. } => "scrollLazy",
            DriverRequest::CaptureTree { .. } => "captureTree",
            DriverRequest::HarvestAssets { .. } => "harvestAssets",
            DriverRequest::CaptureLayout { .. } => "captureLayout",
            DriverRequest::Shutdown => "shutdown",
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: &'a DriverRequest,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    status: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

type Pending = Arc<StdMutex<HashMap<u64, oneshot::Sender<DriverReply>>>>;

/// The running Node helper and its request/reply plumbing.
pub(crate) struct DriverProcess {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    pending: Pending,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
}

impl DriverProcess {
    pub(crate) async fn spawn(options: &BrowserOptions) -> Result<Self> {
        let mut cmd = Command::new(&options.node_command);
        cmd.arg("-e")
            .arg(DRIVER_SCRIPT)
            .arg(if options.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &options.node_command))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PclError::browser("Browser helper stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PclError::browser("Browser helper stdout unavailable"))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "pcl::helper", "{}", line);
                }
            });
        }

        let pending: Pending = Arc::new(StdMutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));
        {
            let pending = pending.clone();
            let alive = alive.clone();
            tokio::spawn(async move {
                let mut frames =
                    FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_REPLY_BYTES));
                while let Some(frame) = frames.next().await {
                    let line = match frame {
                        Ok(line) => line,
                        Err(err) => {
                            warn!(error = %err, "browser helper output unreadable");
                            break;
                        }
                    };
                    match serde_json::from_str::<DriverReply>(&line) {
                        Ok(reply) => {
                            let waiter = lock(&pending).remove(&reply.id);
                            match waiter {
                                Some(tx) => {
                                    let _ = tx.send(reply);
                                }
                                None => debug!(id = reply.id, "reply without waiter"),
                            }
                        }
                        Err(_) => debug!(target: "pcl::helper", "{}", line),
                    }
                }
                alive.store(false, Ordering::SeqCst);
                // Dropping the senders wakes every waiter with an error.
                lock(&pending).clear();
                debug!("browser helper output closed");
            });
        }

        debug!(node = %options.node_command, headless = options.headless, "browser helper started");
        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            alive,
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) async fn call(&self, request: DriverRequest, timeout: Duration) -> Result<Value> {
        let op = request.op();
        if !self.is_alive() {
            return Err(PclError::browser(format!(
                "Browser helper exited before {op}"
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        let mut line = serde_json::to_string(&Envelope {
            id,
            request: &request,
        })?;
        line.push('\n');

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(err) => Err(err),
            }
        };
        if let Err(err) = written {
            lock(&self.pending).remove(&id);
            return Err(PclError::browser(format!(
                "Browser helper is not accepting requests ({op}): {err}"
            )));
        }

        let reply = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(PclError::browser(format!(
                    "Browser helper exited while handling {op}"
                )))
            }
            Err(_) => {
                lock(&self.pending).remove(&id);
                return Err(PclError::browser(format!(
                    "Browser helper timed out after {:?} during {op}",
                    timeout
                )));
            }
        };

        if reply.status == "ok" {
            Ok(reply.result)
        } else {
            Err(map_reply_error(
                op,
                ReplyError {
                    message: reply.message,
                    kind: reply.kind,
                },
            ))
        }
    }

    /// Ask the helper to close the browser, then make sure the process is gone.
    pub(crate) async fn stop(&self) {
        if self.is_alive() {
            if let Err(err) = self.call(DriverRequest::Shutdown, SHUTDOWN_GRACE).await {
                debug!(error = %err, "browser helper shutdown request failed");
            }
        }
        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "browser helper exited"),
            _ => {
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "failed to kill browser helper");
                }
            }
        }
        self.alive.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
