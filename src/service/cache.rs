use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::service::types::{DateRange, PredictResponse};

/// Configuration for the last-result cache
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub enabled: bool, // false when --no-cache
    pub path: PathBuf,
}

impl CacheConfig {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            path: get_cache_path(),
        }
    }
}

/// Get the platform-appropriate cache directory for bitflow
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("bitflow/results"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/bitflow/results",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Clear the result cache directory
pub fn clear_cache(cache_path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(cache_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

/// Last successful `/predict` response for a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub fetched_at: DateTime<Utc>,
    pub response: PredictResponse,
}

fn cache_key(range: &DateRange) -> String {
    format!("predict:{}", range)
}

/// Read the cached response for `range`, if any. Unreadable entries are treated as missing.
pub fn read_cached_response(cache_path: &Path, range: &DateRange) -> Option<CachedResponse> {
    let bytes = cacache::read_sync(cache_path, cache_key(range)).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Store `response` as the latest result for `range`
pub fn write_cached_response(
    cache_path: &Path,
    range: &DateRange,
    response: &PredictResponse,
) -> Result<()> {
    let entry = CachedResponse {
        fetched_at: Utc::now(),
        response: response.clone(),
    };
    let json = serde_json::to_vec(&entry)?;
    cacache::write_sync(cache_path, cache_key(range), json)
        .context("Failed to write result cache")?;
    Ok(())
}
