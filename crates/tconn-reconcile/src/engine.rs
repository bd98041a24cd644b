use std::collections::BTreeMap;

use tconn_schemas::RawConnectionRecord;

use crate::normalize::Normalizer;
use crate::resolve::{HostResolver, Resolution};
use crate::{
    BrokerAddressSet, ClientVersion, IdentityKey, NormalizedConnection, ReconcileReport,
    ReconcileStats,
};

// ---------------------------------------------------------------------------
// Per-key state machine
// ---------------------------------------------------------------------------

/// State of one identity key's bucket.
///
/// A placeholder (unknown-version entry) is only ever admitted into an empty
/// bucket, so `HasData { placeholder: true }` always means "exactly one entry,
/// and it is the placeholder".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    NoData,
    HasData { placeholder: bool },
}

/// What a bucket does with an incoming record before it is normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Unknown version and the key already has data.
    Discard,
    /// Normalize the record; drop the current placeholder first if asked.
    Admit { evict_placeholder: bool },
}

impl KeyState {
    pub fn admit(self, version: &ClientVersion) -> Admission {
        match (self, version.is_unknown()) {
            (KeyState::HasData { .. }, true) => Admission::Discard,
            (KeyState::HasData { placeholder: true }, false) => Admission::Admit {
                evict_placeholder: true,
            },
            _ => Admission::Admit {
                evict_placeholder: false,
            },
        }
    }

    /// State after `version` was appended to the bucket.
    pub fn after_append(self, version: &ClientVersion) -> KeyState {
        match self {
            KeyState::NoData => KeyState::HasData {
                placeholder: version.is_unknown(),
            },
            has_data => has_data,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Bucket {
    state: KeyState,
    entries: Vec<NormalizedConnection>,
}

impl Bucket {
    pub(crate) fn new() -> Self {
        Self {
            state: KeyState::NoData,
            entries: Vec::new(),
        }
    }

    pub(crate) fn offer<R: HostResolver>(
        &mut self,
        raw: &RawConnectionRecord,
        normalizer: &Normalizer<R>,
        brokers: &BrokerAddressSet,
        stats: &mut ReconcileStats,
    ) {
        stats.records_in += 1;

        let version = ClientVersion::parse(&raw.client_version);
        match self.state.admit(&version) {
            Admission::Discard => {
                stats.placeholders_discarded += 1;
                return;
            }
            Admission::Admit { evict_placeholder } => {
                if evict_placeholder {
                    debug_assert_eq!(self.entries.len(), 1);
                    self.entries.clear();
                    self.state = KeyState::NoData;
                    stats.placeholders_evicted += 1;
                }
            }
        }

        let (conn, resolution) = normalizer.normalize_with_resolution(raw);
        if let Resolution::Fallback { address, cause } = resolution {
            stats.unresolved.insert(address, cause);
        }

        // Broker-to-broker traffic is not client traffic.
        if brokers.contains(&conn.hostname) || brokers.contains(&conn.ip) {
            stats.broker_excluded += 1;
            return;
        }

        self.state = self.state.after_append(&conn.client_version);
        self.entries.push(conn);
    }

    pub(crate) fn into_entries(self) -> Vec<NormalizedConnection> {
        self.entries
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Deterministic reconciliation:
/// - Unknown version on a key that already has data => discarded
/// - Known version on a key holding only a placeholder => placeholder evicted
/// - Hostname or ip in `brokers` => excluded
///
/// Buckets are emitted in identity-key order; within a bucket, arrival order.
pub fn reconcile<R: HostResolver>(
    records: &[RawConnectionRecord],
    brokers: &BrokerAddressSet,
    normalizer: &Normalizer<R>,
) -> Vec<NormalizedConnection> {
    reconcile_with_report(records, brokers, normalizer).connections
}

/// [`reconcile`] plus counters for the caller's logs.
pub fn reconcile_with_report<R: HostResolver>(
    records: &[RawConnectionRecord],
    brokers: &BrokerAddressSet,
    normalizer: &Normalizer<R>,
) -> ReconcileReport {
    if records.is_empty() {
        return ReconcileReport::empty();
    }

    let mut stats = ReconcileStats::default();
    let mut buckets: BTreeMap<IdentityKey, Bucket> = BTreeMap::new();

    for raw in records {
        buckets
            .entry(IdentityKey::of(raw))
            .or_insert_with(Bucket::new)
            .offer(raw, normalizer, brokers, &mut stats);
    }

    let connections = buckets
        .into_values()
        .flat_map(Bucket::into_entries)
        .collect();

    ReconcileReport { connections, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticResolver;
    use chrono::{TimeZone, Utc};

    fn rec(ip: &str, version: &str) -> RawConnectionRecord {
        RawConnectionRecord::new(
            1,
            "orders",
            "app-1",
            ip,
            "produce",
            version,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    fn known(v: &str) -> ClientVersion {
        ClientVersion::Known(v.to_string())
    }

    #[test]
    fn state_machine_transitions() {
        let s = KeyState::NoData;
        assert_eq!(
            s.admit(&ClientVersion::Unknown),
            Admission::Admit {
                evict_placeholder: false
            }
        );
        assert_eq!(
            s.after_append(&ClientVersion::Unknown),
            KeyState::HasData { placeholder: true }
        );
        assert_eq!(
            s.after_append(&known("1.0")),
            KeyState::HasData { placeholder: false }
        );

        let ph = KeyState::HasData { placeholder: true };
        assert_eq!(ph.admit(&ClientVersion::Unknown), Admission::Discard);
        assert_eq!(
            ph.admit(&known("1.0")),
            Admission::Admit {
                evict_placeholder: true
            }
        );

        let data = KeyState::HasData { placeholder: false };
        assert_eq!(data.admit(&ClientVersion::Unknown), Admission::Discard);
        assert_eq!(
            data.admit(&known("2.0")),
            Admission::Admit {
                evict_placeholder: false
            }
        );
        assert_eq!(data.after_append(&known("2.0")), data);
    }

    #[test]
    fn report_counts_discards_evictions_and_exclusions() {
        let brokers: BrokerAddressSet = ["10.0.0.5"].into_iter().collect();
        let n = Normalizer::new(StaticResolver::new());
        let records = vec![
            rec("10.1.1.1", "-1"),
            rec("10.1.1.1", "unknown"),
            rec("10.1.1.1", "2.3.0"),
            rec("10.0.0.5", "2.3.0"),
        ];

        let report = reconcile_with_report(&records, &brokers, &n);
        assert_eq!(report.connections.len(), 1);
        assert_eq!(report.stats.records_in, 4);
        assert_eq!(report.stats.placeholders_discarded, 1);
        assert_eq!(report.stats.placeholders_evicted, 1);
        assert_eq!(report.stats.broker_excluded, 1);
        assert!(report.stats.unresolved.contains_key("10.1.1.1"));
    }

    #[test]
    fn excluded_known_record_still_evicts_placeholder() {
        // Eviction happens before the broker check.
        let brokers: BrokerAddressSet = ["edge-7"].into_iter().collect();
        let records = vec![rec("10.9.9.9", "-1"), rec("10.9.9.9", "3.0.0")];

        // First lookup fails (placeholder kept under its raw ip), second one
        // resolves to a broker host.
        let cold = Normalizer::new(StaticResolver::new());
        let warm = Normalizer::new(
            StaticResolver::new().with(std::net::Ipv4Addr::new(10, 9, 9, 9), "edge-7"),
        );

        let mut bucket = Bucket::new();
        let mut stats = ReconcileStats::default();
        bucket.offer(&records[0], &cold, &brokers, &mut stats);
        assert_eq!(bucket.state, KeyState::HasData { placeholder: true });
        bucket.offer(&records[1], &warm, &brokers, &mut stats);
        assert_eq!(bucket.state, KeyState::NoData);
        assert!(bucket.into_entries().is_empty());
        assert_eq!(stats.placeholders_evicted, 1);
        assert_eq!(stats.broker_excluded, 1);
    }

    #[test]
    fn multiple_known_versions_are_all_kept_in_arrival_order() {
        let n = Normalizer::new(StaticResolver::new());
        let records = vec![
            rec("10.1.1.1", "2.3.0"),
            rec("10.1.1.1", "-1"),
            rec("10.1.1.1", "2.4.0"),
        ];
        let out = reconcile(&records, &BrokerAddressSet::empty(), &n);
        let versions: Vec<&str> = out.iter().map(|c| c.client_version.as_str()).collect();
        assert_eq!(versions, vec!["2.3.0", "2.4.0"]);
    }
}
