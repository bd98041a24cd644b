//! In-process store with the same read semantics as the Postgres queries.
//! Used when the daemon runs without a database, and by tests.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tconn_schemas::RawConnectionRecord;
use tokio::sync::RwLock;

use crate::{ConnectionFilter, ConnectionStore};

/// (cluster, topic, app, ip, type, version)
type VersionedIdentity = (i64, String, String, String, String, String);

fn versioned_identity(r: &RawConnectionRecord) -> VersionedIdentity {
    (
        r.cluster_id,
        r.topic_name.clone(),
        r.app_id.clone(),
        r.ip.clone(),
        r.client_type.clone(),
        r.client_version.clone(),
    )
}

#[derive(Debug, Default)]
pub struct MemoryConnectionStore {
    rows: RwLock<Vec<RawConnectionRecord>>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<RawConnectionRecord>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConnectionStore for MemoryConnectionStore {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    async fn replace(&self, rec: &RawConnectionRecord) -> Result<u64> {
        let mut rows = self.rows.write().await;
        if !rows.iter().any(|r| r == rec) {
            rows.push(rec.clone());
        }
        Ok(1)
    }

    async fn fetch(&self, filter: &ConnectionFilter) -> Result<Vec<RawConnectionRecord>> {
        filter.validate()?;

        let rows = self.rows.read().await;
        let mut latest: BTreeMap<VersionedIdentity, DateTime<Utc>> = BTreeMap::new();
        for r in rows.iter().filter(|r| filter.matches(r)) {
            let slot = latest.entry(versioned_identity(r)).or_insert(r.created_at);
            if r.created_at > *slot {
                *slot = r.created_at;
            }
        }

        let mut out: Vec<RawConnectionRecord> = latest
            .into_iter()
            .map(
                |((cluster_id, topic_name, app_id, ip, client_type, client_version), created_at)| {
                    RawConnectionRecord {
                        cluster_id,
                        topic_name,
                        app_id,
                        ip,
                        client_type,
                        client_version,
                        created_at,
                    }
                },
            )
            .collect();

        // Same order as the SQL: oldest latest-bucket first, then identity + version.
        out.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| versioned_identity(a).cmp(&versioned_identity(b)))
        });
        Ok(out)
    }
}
