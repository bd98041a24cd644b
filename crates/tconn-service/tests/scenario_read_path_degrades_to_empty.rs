// Store and resolver failures never surface to callers: reads degrade to an
// empty list (or false), hostnames degrade to the raw address.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use tconn_config::ResolverSettings;
use tconn_db::{ConnectionFilter, ConnectionStore, MemoryConnectionStore};
use tconn_reconcile::{HostResolver, ResolveError};
use tconn_schemas::RawConnectionRecord;
use tconn_service::{BrokerRegistry, TopicConnectionService};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

struct UnavailableStore;

#[async_trait::async_trait]
impl ConnectionStore for UnavailableStore {
    fn source_name(&self) -> &'static str {
        "unavailable"
    }

    async fn replace(&self, _rec: &RawConnectionRecord) -> Result<u64> {
        bail!("connection refused")
    }

    async fn fetch(&self, _filter: &ConnectionFilter) -> Result<Vec<RawConnectionRecord>> {
        bail!("connection refused")
    }
}

struct SlowResolver;

impl HostResolver for SlowResolver {
    fn resolve(&self, _addr: Ipv4Addr) -> Result<String, ResolveError> {
        std::thread::sleep(Duration::from_millis(400));
        Ok("too-late".to_string())
    }
}

#[tokio::test]
async fn store_failure_reads_as_empty_and_false() {
    let svc = TopicConnectionService::new(
        Arc::new(UnavailableStore),
        BrokerRegistry::new(),
        Arc::new(SlowResolver),
        ResolverSettings::default(),
    );

    assert!(svc.get_by_topic(1, "orders", at(0), at(10)).await.is_empty());
    assert!(svc
        .get_by_topic_and_app(1, "orders", "svc", at(0), at(10))
        .await
        .is_empty());
    assert!(svc.get_by_app("svc", at(0), at(10)).await.is_empty());
    assert!(!svc.is_exist_connection(1, "orders", at(0), at(10)).await);
    assert!(
        !svc.is_exist_connection_for_app(1, "orders", "svc", at(0), at(10))
            .await
    );
}

#[tokio::test]
async fn slow_lookup_falls_back_to_the_raw_address() {
    let store = MemoryConnectionStore::with_rows(vec![RawConnectionRecord::new(
        1, "orders", "svc", "10.0.0.1", "produce", "1.0.0", at(5),
    )]);
    let settings = ResolverSettings {
        timeout_ms: 20,
        ..ResolverSettings::default()
    };
    let svc = TopicConnectionService::new(
        Arc::new(store),
        BrokerRegistry::new(),
        Arc::new(SlowResolver),
        settings,
    );

    let got = svc.get_by_topic(1, "orders", at(0), at(10)).await;
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].hostname, "10.0.0.1");
    assert_eq!(got[0].ip, "10.0.0.1");
}

#[tokio::test]
async fn invalid_window_reads_as_empty() {
    let store = MemoryConnectionStore::with_rows(vec![RawConnectionRecord::new(
        1, "orders", "svc", "10.0.0.1", "produce", "1.0.0", at(5),
    )]);
    let svc = TopicConnectionService::new(
        Arc::new(store),
        BrokerRegistry::new(),
        Arc::new(SlowResolver),
        ResolverSettings::default(),
    );

    assert!(svc.get_by_topic(1, "orders", at(10), at(0)).await.is_empty());
}
