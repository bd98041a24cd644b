//! Shared runtime state for tconn-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The service inside is
//! cheap to clone and owns the store, broker registry and resolver.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tconn_config::{secrets, ConnectionsConfig};
use tconn_db::{ConnectionStore, MemoryConnectionStore, PgConnectionStore};
use tconn_service::TopicConnectionService;
use tracing::{info, warn};

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub connections: TopicConnectionService,
}

impl AppState {
    pub fn new(connections: TopicConnectionService) -> Self {
        Self {
            build: BuildInfo {
                service: "tconn-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            connections,
        }
    }

    /// Postgres when the configured URL env var is set, otherwise an
    /// in-memory store that lives as long as the process.
    pub async fn from_config(cfg: &ConnectionsConfig) -> Result<Self> {
        let store: Arc<dyn ConnectionStore> = match secrets::database_url(cfg) {
            Some(url) => {
                let pool = tconn_db::connect(url.expose())
                    .await
                    .context("daemon boot: connect to database")?;
                tconn_db::migrate(&pool)
                    .await
                    .context("daemon boot: migrate")?;
                info!(url_env = %cfg.database.url_env, "using postgres connection store");
                Arc::new(PgConnectionStore::new(pool))
            }
            None => {
                warn!(
                    url_env = %cfg.database.url_env,
                    "database url not set; connections are kept in memory only"
                );
                Arc::new(MemoryConnectionStore::new())
            }
        };

        let connections = TopicConnectionService::from_config(store, cfg)?;
        Ok(Self::new(connections))
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
