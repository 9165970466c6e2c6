use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use pcl_lib::{
    parse_snapshot_path, BrowserManager, Config, OfflineDriver, PageDriver, PageSnapshot,
    PclError, ProgressCallback, ProgressEvent, TemplateDocument,
};

/// Environment variable that replaces scraping with a stored snapshot.
pub const MOCK_SNAPSHOT_ENV: &str = "PCL_MOCK_SNAPSHOT";

/// Snapshot path from the mock environment variable, if set.
pub fn mock_snapshot_path() -> Option<PathBuf> {
    std::env::var(MOCK_SNAPSHOT_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Load a snapshot written by `pcl capture`.
pub fn load_snapshot(path: &Path) -> Result<PageSnapshot, PclError> {
    let path = parse_snapshot_path(path)?;
    let data = std::fs::read_to_string(&path)?;
    serde_json::from_str(&data).map_err(|e| {
        PclError::Config(format!(
            "Invalid snapshot {}: {e}",
            path.display()
        ))
    })
}

/// Write the template document alone, pretty-printed.
pub fn write_document(doc: &TemplateDocument, path: &Path) -> Result<(), PclError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve where verification screenshots go and whether they are kept.
/// An explicit directory implies keeping them.
pub fn resolve_artifacts_dir(custom: Option<&Path>, keep: bool) -> (Option<PathBuf>, bool) {
    if let Some(dir) = custom {
        return (Some(dir.to_path_buf()), true);
    }
    if !keep {
        return (None, false);
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = std::env::temp_dir().join(format!("pcl-{}-{timestamp}", std::process::id()));
    (Some(dir), true)
}

/// The browser behind a command. Snapshot replay gets a driver that refuses
/// every page, so verification falls back instead of touching the network.
pub fn build_driver(config: &Config, replaying: bool) -> (Arc<dyn PageDriver>, Option<BrowserManager>) {
    if replaying {
        let driver = OfflineDriver::new(format!("{MOCK_SNAPSHOT_ENV} replay has no live browser"));
        return (Arc::new(driver), None);
    }
    let manager = BrowserManager::new(config.browser.clone().into());
    (Arc::new(manager.clone()), Some(manager))
}

/// Progress sink for `--verbose`: `[phase] NN%` lines on stderr.
pub fn progress_logger(verbose: bool) -> Option<ProgressCallback> {
    if !verbose {
        return None;
    }
    Some(Arc::new(|event: &ProgressEvent| {
        eprintln!("[{}] {:>3}%", event.phase, event.progress);
    }))
}

/// Stop the shared browser helper, if one was started.
pub async fn shutdown(manager: Option<BrowserManager>) {
    if let Some(manager) = manager {
        if let Err(err) = manager.shutdown().await {
            tracing::warn!(error = %err, "browser helper shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn explicit_artifacts_dir_implies_keep() {
        let (dir, keep) = resolve_artifacts_dir(Some(Path::new("shots")), false);
        assert_eq!(dir, Some(PathBuf::from("shots")));
        assert!(keep);
    }

    #[test]
    fn artifacts_are_not_kept_by_default() {
        assert_eq!(resolve_artifacts_dir(None, false), (None, false));
        let (dir, keep) = resolve_artifacts_dir(None, true);
        assert!(keep);
        assert!(dir.is_some_and(|d| d.starts_with(std::env::temp_dir())));
    }

    #[test]
    fn load_snapshot_rejects_bad_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("snap.json");
        std::fs::write(&path, "{not json").expect("write");
        let err = load_snapshot(&path).expect_err("invalid snapshot");
        assert!(err.to_string().contains("Invalid snapshot"));
    }

    #[test]
    fn load_snapshot_rejects_missing_files() {
        let err = load_snapshot(Path::new("/nonexistent/snap.json")).expect_err("missing");
        assert!(err.to_string().contains("not found"));
    }
}
