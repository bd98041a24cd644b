use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed client-to-topic interaction, as captured by the gateway and
/// persisted per time bucket.
///
/// `client_type` is the traffic direction (`produce` | `fetch` | anything else).
/// `client_version` is kept verbatim: `"-1"` and `"unknown"` both mean the
/// version could not be determined at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConnectionRecord {
    pub cluster_id: i64,
    pub topic_name: String,
    pub app_id: String,
    pub ip: String,
    pub client_type: String,
    pub client_version: String,
    /// Time bucket the interaction was observed in.
    pub created_at: DateTime<Utc>,
}

impl RawConnectionRecord {
    pub fn new(
        cluster_id: i64,
        topic_name: impl Into<String>,
        app_id: impl Into<String>,
        ip: impl Into<String>,
        client_type: impl Into<String>,
        client_version: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            cluster_id,
            topic_name: topic_name.into(),
            app_id: app_id.into(),
            ip: ip.into(),
            client_type: client_type.into(),
            client_version: client_version.into(),
            created_at,
        }
    }
}

/// Aggregate outcome of a batch ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAddResponse {
    pub total: usize,
    pub succeeded: usize,
}
