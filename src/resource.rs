use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::PclError;

#[derive(Debug, Error)]
pub enum ResourceParseError {
    #[error("Invalid URL '{value}': {message}. Hint: include http(s):// and ensure the URL is well-formed.")]
    InvalidUrl { value: String, message: String },
    #[error("Unsupported URL scheme '{scheme}' in '{value}'. Only http and https pages can be cloned.")]
    UnsupportedScheme { value: String, scheme: String },
    #[error("URL '{value}' has no host.")]
    MissingHost { value: String },
    #[error("Snapshot file not found: {path}. Hint: check the path relative to the current working directory or use an absolute path.")]
    FileNotFound { path: String },
    #[error("Unsupported snapshot extension '{extension}'. Snapshots are JSON files written by `pcl capture`.")]
    UnsupportedExtension { extension: String },
}

impl From<ResourceParseError> for PclError {
    fn from(err: ResourceParseError) -> Self {
        match err {
            ResourceParseError::InvalidUrl { ref value, .. }
            | ResourceParseError::UnsupportedScheme { ref value, .. }
            | ResourceParseError::MissingHost { ref value } => PclError::InvalidUrl {
                url: value.clone(),
                message: err.to_string(),
            },
            other => PclError::Config(other.to_string()),
        }
    }
}

/// Parse and check the page to clone: absolute, http(s), with a host.
pub fn parse_target_url(value: &str) -> Result<Url, ResourceParseError> {
    let trimmed = value.trim();
    let url = Url::parse(trimmed).map_err(|e| ResourceParseError::InvalidUrl {
        value: trimmed.to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ResourceParseError::UnsupportedScheme {
                value: trimmed.to_string(),
                scheme: scheme.to_string(),
            })
        }
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(ResourceParseError::MissingHost {
            value: trimmed.to_string(),
        });
    }

    Ok(url)
}

/// Resolve an asset reference found on `base` into an absolute URL.
///
/// Inline `data:` payloads and fragment-only references are skipped.
pub fn resolve_reference(base: &Url, raw: &str) -> Option<String> {
    let candidate = raw.trim();
    if candidate.is_empty() || candidate.starts_with("data:") || candidate.starts_with('#') {
        return None;
    }
    base.join(candidate).ok().map(|u| u.to_string())
}

/// Check a stored snapshot path before loading it.
pub fn parse_snapshot_path(value: &Path) -> Result<PathBuf, ResourceParseError> {
    let extension = value
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if extension != "json" {
        return Err(ResourceParseError::UnsupportedExtension {
            extension: if extension.is_empty() {
                "no extension".to_string()
            } else {
                extension
            },
        });
    }

    if !value.is_file() {
        return Err(ResourceParseError::FileNotFound {
            path: value.to_string_lossy().into_owned(),
        });
    }

    Ok(value.to_path_buf())
}
