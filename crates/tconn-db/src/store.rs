use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tconn_schemas::RawConnectionRecord;

use crate::{fetch_connections, replace_connection, ConnectionFilter};

/// Storage seen by the read and write paths.
///
/// Reads return one row per (identity, version) in the window, oldest latest
/// bucket first. Any method may fail; callers decide how to degrade.
#[async_trait::async_trait]
pub trait ConnectionStore: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn replace(&self, rec: &RawConnectionRecord) -> Result<u64>;

    async fn fetch(&self, filter: &ConnectionFilter) -> Result<Vec<RawConnectionRecord>>;

    async fn fetch_by_topic(
        &self,
        cluster_id: i64,
        topic_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawConnectionRecord>> {
        self.fetch(&ConnectionFilter {
            cluster_id: Some(cluster_id),
            topic_name: Some(topic_name.to_string()),
            app_id: None,
            start,
            end,
        })
        .await
    }

    /// App filter is applied by the store, not by the caller.
    async fn fetch_by_topic_and_app(
        &self,
        cluster_id: i64,
        topic_name: &str,
        app_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawConnectionRecord>> {
        self.fetch(&ConnectionFilter {
            cluster_id: Some(cluster_id),
            topic_name: Some(topic_name.to_string()),
            app_id: Some(app_id.to_string()),
            start,
            end,
        })
        .await
    }

    async fn fetch_by_app(
        &self,
        app_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawConnectionRecord>> {
        self.fetch(&ConnectionFilter {
            cluster_id: None,
            topic_name: None,
            app_id: Some(app_id.to_string()),
            start,
            end,
        })
        .await
    }
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgConnectionStore {
    pool: PgPool,
}

impl PgConnectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl ConnectionStore for PgConnectionStore {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn replace(&self, rec: &RawConnectionRecord) -> Result<u64> {
        replace_connection(&self.pool, rec).await
    }

    async fn fetch(&self, filter: &ConnectionFilter) -> Result<Vec<RawConnectionRecord>> {
        fetch_connections(&self.pool, filter).await
    }
}
