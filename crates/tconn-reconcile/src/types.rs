use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tconn_schemas::RawConnectionRecord;

use crate::resolve::FallbackCause;

/// Numeric form of the unknown-version sentinel, as written by older gateways.
pub const CLIENT_VERSION_CODE_UNKNOWN: &str = "-1";

/// Canonical string form of the unknown-version sentinel.
pub const CLIENT_VERSION_NAME_UNKNOWN: &str = "unknown";

/// Domain suffix stripped from resolved broker-network hostnames.
pub const DEFAULT_BROKER_HOST_SUFFIX: &str = ".diditaxi.com";

/// Client version with both legacy sentinels collapsed into one variant.
///
/// Serializes as the plain version string; `Unknown` always renders as
/// `"unknown"`, never `"-1"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientVersion {
    Known(String),
    Unknown,
}

/// `-1` and `unknown` both mean the version was not captured.
fn is_sentinel(raw: &str) -> bool {
    raw == CLIENT_VERSION_CODE_UNKNOWN || raw == CLIENT_VERSION_NAME_UNKNOWN
}

impl ClientVersion {
    pub fn parse(raw: &str) -> Self {
        if is_sentinel(raw) {
            ClientVersion::Unknown
        } else {
            ClientVersion::Known(raw.to_string())
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ClientVersion::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ClientVersion::Known(v) => v,
            ClientVersion::Unknown => CLIENT_VERSION_NAME_UNKNOWN,
        }
    }
}

impl From<String> for ClientVersion {
    fn from(raw: String) -> Self {
        if is_sentinel(&raw) {
            ClientVersion::Unknown
        } else {
            ClientVersion::Known(raw)
        }
    }
}

impl From<ClientVersion> for String {
    fn from(v: ClientVersion) -> Self {
        match v {
            ClientVersion::Known(s) => s,
            ClientVersion::Unknown => CLIENT_VERSION_NAME_UNKNOWN.to_string(),
        }
    }
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the client on the topic, derived from the traffic direction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientRole {
    Producer,
    Consumer,
    /// Direction was neither `produce` nor `fetch`. Renders as `""`.
    Unrecognized,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Producer => "producer",
            ClientRole::Consumer => "consumer",
            ClientRole::Unrecognized => "",
        }
    }
}

impl From<String> for ClientRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "producer" => ClientRole::Producer,
            "consumer" => ClientRole::Consumer,
            _ => ClientRole::Unrecognized,
        }
    }
}

impl From<ClientRole> for String {
    fn from(r: ClientRole) -> Self {
        r.as_str().to_string()
    }
}

/// Fields that decide whether two raw rows describe the same logical connection.
///
/// Version and time bucket are deliberately absent: rows differing only in
/// those are merge candidates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub cluster_id: i64,
    pub topic_name: String,
    pub app_id: String,
    pub client_type: String,
    pub ip: String,
}

impl IdentityKey {
    pub fn of(raw: &RawConnectionRecord) -> Self {
        Self {
            cluster_id: raw.cluster_id,
            topic_name: raw.topic_name.clone(),
            app_id: raw.app_id.clone(),
            client_type: raw.client_type.clone(),
            ip: raw.ip.clone(),
        }
    }
}

/// Read-only snapshot of the hostnames and IPs of one cluster's brokers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerAddressSet {
    members: BTreeSet<String>,
}

impl BrokerAddressSet {
    /// No exclusion at all (no cluster specified).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, host_or_ip: &str) -> bool {
        self.members.contains(host_or_ip)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for BrokerAddressSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Display-ready connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedConnection {
    pub cluster_id: i64,
    pub topic_name: String,
    pub client_role: ClientRole,
    pub app_id: String,
    pub client_version: ClientVersion,
    pub ip: String,
    /// Resolved name with the broker domain suffix stripped, or `ip` when
    /// resolution failed.
    pub hostname: String,
}

/// Counters collected while reconciling. Used by callers for logging only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub records_in: usize,
    /// Unknown-version records dropped because their key already had data.
    pub placeholders_discarded: usize,
    /// Unknown-version entries removed when a known version arrived.
    pub placeholders_evicted: usize,
    /// Normalized entries dropped as broker self-traffic.
    pub broker_excluded: usize,
    /// Addresses whose hostname fell back to the raw address, with the cause.
    pub unresolved: BTreeMap<String, FallbackCause>,
}

impl ReconcileStats {
    pub fn merge(&mut self, other: ReconcileStats) {
        self.records_in += other.records_in;
        self.placeholders_discarded += other.placeholders_discarded;
        self.placeholders_evicted += other.placeholders_evicted;
        self.broker_excluded += other.broker_excluded;
        self.unresolved.extend(other.unresolved);
    }
}

/// Reconciled connections plus what happened on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    pub connections: Vec<NormalizedConnection>,
    pub stats: ReconcileStats,
}

impl ReconcileReport {
    pub fn empty() -> Self {
        Self {
            connections: Vec::new(),
            stats: ReconcileStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_deserialize_agree_on_sentinels() {
        for raw in ["-1", "unknown", "2.3.0", "", "Unknown", "-10"] {
            assert_eq!(
                ClientVersion::parse(raw),
                ClientVersion::from(raw.to_string()),
                "disagree on {raw:?}"
            );
        }
        assert!(ClientVersion::parse("-1").is_unknown());
        assert!(ClientVersion::parse("unknown").is_unknown());
        assert!(!ClientVersion::parse("Unknown").is_unknown());
        assert_eq!(String::from(ClientVersion::parse("-1")), "unknown");
    }
}
