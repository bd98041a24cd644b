//! Command handler modules for tconn-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod connections;
pub mod ingest;

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use tconn_config::{secrets, ConfigMode, ConnectionsConfig, UnusedKeyPolicy};
use tconn_db::PgConnectionStore;
use tconn_schemas::RawConnectionRecord;
use tconn_service::TopicConnectionService;
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Typed config from `--config` layers; defaults when none are given.
pub fn load_settings(config_paths: &[String]) -> Result<ConnectionsConfig> {
    if config_paths.is_empty() {
        return Ok(ConnectionsConfig::default());
    }

    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = tconn_config::load_layered_yaml(&path_refs)?;
    let report =
        tconn_config::report_unused_keys(ConfigMode::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys the cli does not read");
    }
    loaded.settings()
}

/// Inclusive `[start_ms, end_ms]` window as timestamps.
pub fn parse_window(start_ms: i64, end_ms: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc
        .timestamp_millis_opt(start_ms)
        .single()
        .with_context(|| format!("--start-ms out of range: {start_ms}"))?;
    let end = Utc
        .timestamp_millis_opt(end_ms)
        .single()
        .with_context(|| format!("--end-ms out of range: {end_ms}"))?;
    if start > end {
        bail!("--start-ms ({start_ms}) is after --end-ms ({end_ms})");
    }
    Ok((start, end))
}

/// Read a JSON array of raw records. A UTF-8 BOM is tolerated.
pub fn load_records(path: &str) -> Result<Vec<RawConnectionRecord>> {
    let bytes = fs::read(path).with_context(|| format!("read records file failed: {}", path))?;
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
    let raw = String::from_utf8(bytes.to_vec()).context("records file must be UTF-8 text")?;
    serde_json::from_str(raw.trim()).context("records file must be a JSON array of connection records")
}

/// Service over Postgres. The URL comes from the env var the config names.
pub async fn connect_service(cfg: &ConnectionsConfig) -> Result<TopicConnectionService> {
    let url = secrets::resolve_database_url(cfg)?;
    let pool = tconn_db::connect(url.expose()).await?;
    TopicConnectionService::from_config(Arc::new(PgConnectionStore::new(pool)), cfg)
}
