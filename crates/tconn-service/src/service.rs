use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tconn_config::{ConnectionsConfig, ResolverSettings};
use tconn_db::ConnectionStore;
use tconn_reconcile::{
    reconcile_with_report, HostResolver, NormalizedConnection, Normalizer, SystemResolver,
};
use tconn_schemas::RawConnectionRecord;
use tracing::{debug, error, info, warn};

use crate::brokers::BrokerRegistry;
use crate::hostnames::prefetch_hostnames;

#[derive(Clone)]
pub struct TopicConnectionService {
    store: Arc<dyn ConnectionStore>,
    brokers: BrokerRegistry,
    resolver: Arc<dyn HostResolver + Send + Sync>,
    settings: ResolverSettings,
}

impl TopicConnectionService {
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        brokers: BrokerRegistry,
        resolver: Arc<dyn HostResolver + Send + Sync>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            brokers,
            resolver,
            settings,
        }
    }

    /// Platform resolver, broker sets and resolver settings from config.
    pub fn from_config(store: Arc<dyn ConnectionStore>, cfg: &ConnectionsConfig) -> Result<Self> {
        Ok(Self::new(
            store,
            BrokerRegistry::from_config(cfg)?,
            Arc::new(SystemResolver),
            cfg.resolver.clone(),
        ))
    }

    pub fn brokers(&self) -> &BrokerRegistry {
        &self.brokers
    }

    pub fn store_name(&self) -> &'static str {
        self.store.source_name()
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Reconciled connections for a topic, broker self-traffic excluded.
    pub async fn get_by_topic(
        &self,
        cluster_id: i64,
        topic_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<NormalizedConnection> {
        let records = match self
            .store
            .fetch_by_topic(cluster_id, topic_name, start, end)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(cluster_id, topic_name, error = %e, "get topic connections failed");
                return Vec::new();
            }
        };
        self.reconcile(Some(cluster_id), &records).await
    }

    pub async fn get_by_topic_and_app(
        &self,
        cluster_id: i64,
        topic_name: &str,
        app_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<NormalizedConnection> {
        let records = match self
            .store
            .fetch_by_topic_and_app(cluster_id, topic_name, app_id, start, end)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(
                    cluster_id,
                    topic_name,
                    app_id,
                    error = %e,
                    "get topic connections for app failed"
                );
                return Vec::new();
            }
        };
        self.reconcile(Some(cluster_id), &records).await
    }

    /// Connections of one app across all clusters. No broker exclusion: the
    /// rows may span clusters and there is no single broker set to apply.
    pub async fn get_by_app(
        &self,
        app_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<NormalizedConnection> {
        let records = match self.store.fetch_by_app(app_id, start, end).await {
            Ok(r) => r,
            Err(e) => {
                error!(app_id, error = %e, "get app connections failed");
                return Vec::new();
            }
        };
        self.reconcile(None, &records).await
    }

    /// True when the reconciled list is non-empty, so a topic seen only by
    /// its own brokers reads as unconnected. Store errors read as false.
    pub async fn is_exist_connection(
        &self,
        cluster_id: i64,
        topic_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        !self
            .get_by_topic(cluster_id, topic_name, start, end)
            .await
            .is_empty()
    }

    pub async fn is_exist_connection_for_app(
        &self,
        cluster_id: i64,
        topic_name: &str,
        app_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        !self
            .get_by_topic_and_app(cluster_id, topic_name, app_id, start, end)
            .await
            .is_empty()
    }

    async fn reconcile(
        &self,
        cluster_id: Option<i64>,
        records: &[RawConnectionRecord],
    ) -> Vec<NormalizedConnection> {
        if records.is_empty() {
            return Vec::new();
        }

        let brokers = self.brokers.addresses_for(cluster_id).await;
        let table = prefetch_hostnames(records, Arc::clone(&self.resolver), &self.settings).await;
        let normalizer =
            Normalizer::new(table).with_broker_host_suffix(self.settings.broker_host_suffix.as_str());

        let report = reconcile_with_report(records, &brokers, &normalizer);

        for (address, cause) in &report.stats.unresolved {
            warn!(address = %address, cause = %cause, "get hostname failed");
        }
        debug!(
            cluster_id = ?cluster_id,
            records_in = report.stats.records_in,
            connections_out = report.connections.len(),
            placeholders_discarded = report.stats.placeholders_discarded,
            placeholders_evicted = report.stats.placeholders_evicted,
            broker_excluded = report.stats.broker_excluded,
            "reconciled topic connections"
        );
        report.connections
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Upsert each record on its own. Returns how many were stored.
    pub async fn batch_add(&self, records: &[RawConnectionRecord]) -> usize {
        if records.is_empty() {
            return 0;
        }

        let mut succeeded = 0usize;
        for rec in records {
            match self.store.replace(rec).await {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    error!(
                        cluster_id = rec.cluster_id,
                        topic_name = %rec.topic_name,
                        app_id = %rec.app_id,
                        ip = %rec.ip,
                        error = %e,
                        "replace topic connection failed"
                    );
                }
            }
        }

        info!(
            total = records.len(),
            succeeded,
            store = self.store.source_name(),
            "batch add topic connections"
        );
        succeeded
    }
}
