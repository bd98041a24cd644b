//! Request and response types for all tconn-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use serde::{Deserialize, Serialize};
use tconn_reconcile::NormalizedConnection;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    /// "postgres" | "memory"
    pub store: String,
    pub uptime_secs: u64,
}

// ---------------------------------------------------------------------------
// Errors (400)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Connection reads
// ---------------------------------------------------------------------------

/// Query string for the windowed reads. Millisecond epoch, inclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowQuery {
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<NormalizedConnection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
}

// ---------------------------------------------------------------------------
// /v1/clusters/:cluster_id/brokers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokersResponse {
    pub cluster_id: i64,
    pub addresses: Vec<String>,
}
