use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tconn_config::ConnectionsConfig;
use tconn_reconcile::BrokerAddressSet;
use tokio::sync::RwLock;

/// Per-cluster broker address snapshots.
///
/// Readers get an `Arc` to an immutable snapshot; a refresh swaps the whole
/// set for a cluster and never mutates one in place.
#[derive(Clone, Debug, Default)]
pub struct BrokerRegistry {
    inner: Arc<RwLock<BTreeMap<i64, Arc<BrokerAddressSet>>>>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &ConnectionsConfig) -> Result<Self> {
        let snapshots = cfg
            .broker_sets()?
            .into_iter()
            .map(|(id, hosts)| (id, Arc::new(hosts.into_iter().collect::<BrokerAddressSet>())))
            .collect();
        Ok(Self {
            inner: Arc::new(RwLock::new(snapshots)),
        })
    }

    /// Snapshot for `cluster_id`. No cluster, or an unknown one, gets the
    /// empty set (no exclusion).
    pub async fn addresses_for(&self, cluster_id: Option<i64>) -> Arc<BrokerAddressSet> {
        let Some(id) = cluster_id else {
            return Arc::new(BrokerAddressSet::empty());
        };
        match self.inner.read().await.get(&id) {
            Some(set) => Arc::clone(set),
            None => Arc::new(BrokerAddressSet::empty()),
        }
    }

    pub async fn replace(&self, cluster_id: i64, set: BrokerAddressSet) {
        self.inner.write().await.insert(cluster_id, Arc::new(set));
    }

    pub async fn remove(&self, cluster_id: i64) -> bool {
        self.inner.write().await.remove(&cluster_id).is_some()
    }

    pub async fn clusters(&self) -> Vec<i64> {
        self.inner.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_and_absent_clusters_get_empty_set() {
        let reg = BrokerRegistry::new();
        reg.replace(1, ["kafka-b1", "10.0.0.5"].into_iter().collect()).await;

        assert_eq!(reg.addresses_for(Some(1)).await.len(), 2);
        assert!(reg.addresses_for(Some(2)).await.is_empty());
        assert!(reg.addresses_for(None).await.is_empty());
    }

    #[tokio::test]
    async fn replace_does_not_touch_held_snapshots() {
        let reg = BrokerRegistry::new();
        reg.replace(1, ["kafka-b1"].into_iter().collect()).await;
        let held = reg.addresses_for(Some(1)).await;

        reg.replace(1, ["kafka-b9"].into_iter().collect()).await;
        assert!(held.contains("kafka-b1"));
        assert!(reg.addresses_for(Some(1)).await.contains("kafka-b9"));
        assert!(reg.remove(1).await);
        assert!(reg.clusters().await.is_empty());
    }

    #[tokio::test]
    async fn seeded_from_config() {
        let mut cfg = ConnectionsConfig::default();
        cfg.brokers
            .insert("3".to_string(), vec!["kafka-b3".to_string()]);
        let reg = BrokerRegistry::from_config(&cfg).unwrap();
        assert_eq!(reg.clusters().await, vec![3]);
        assert!(reg.addresses_for(Some(3)).await.contains("kafka-b3"));
    }
}
