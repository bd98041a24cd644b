//! Axum router and all HTTP handlers for tconn-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use tconn_reconcile::BrokerAddressSet;
use tconn_schemas::{BatchAddResponse, RawConnectionRecord};
use tracing::info;

use crate::{
    api_types::{
        BrokersResponse, ConnectionsResponse, ErrorResponse, ExistsResponse, HealthResponse,
        WindowQuery,
    },
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route(
            "/v1/clusters/:cluster_id/topics/:topic/connections",
            get(topic_connections),
        )
        .route(
            "/v1/clusters/:cluster_id/topics/:topic/connections/exists",
            get(topic_connections_exist),
        )
        .route("/v1/apps/:app_id/connections", get(app_connections))
        .route("/v1/connections/batch", post(batch_add))
        .route(
            "/v1/clusters/:cluster_id/brokers",
            get(get_brokers).put(put_brokers),
        )
        .with_state(state)
}

/// `[start_ms, end_ms]` as timestamps, or a 400 response.
#[allow(clippy::result_large_err)]
fn window(q: &WindowQuery) -> Result<(DateTime<Utc>, DateTime<Utc>), Response> {
    let bad = |msg: String| {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
    };
    let start = Utc
        .timestamp_millis_opt(q.start_ms)
        .single()
        .ok_or_else(|| bad(format!("start_ms out of range: {}", q.start_ms)))?;
    let end = Utc
        .timestamp_millis_opt(q.end_ms)
        .single()
        .ok_or_else(|| bad(format!("end_ms out of range: {}", q.end_ms)))?;
    if start > end {
        return Err(bad(format!(
            "start_ms ({}) is after end_ms ({})",
            q.start_ms, q.end_ms
        )));
    }
    Ok((start, end))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            store: st.connections.store_name().to_string(),
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/clusters/:cluster_id/topics/:topic/connections
// ---------------------------------------------------------------------------

pub(crate) async fn topic_connections(
    State(st): State<Arc<AppState>>,
    Path((cluster_id, topic)): Path<(i64, String)>,
    Query(q): Query<WindowQuery>,
) -> Response {
    let (start, end) = match window(&q) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    let connections = match q.app_id.as_deref() {
        Some(app_id) => {
            st.connections
                .get_by_topic_and_app(cluster_id, &topic, app_id, start, end)
                .await
        }
        None => {
            st.connections
                .get_by_topic(cluster_id, &topic, start, end)
                .await
        }
    };

    (StatusCode::OK, Json(ConnectionsResponse { connections })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/clusters/:cluster_id/topics/:topic/connections/exists
// ---------------------------------------------------------------------------

pub(crate) async fn topic_connections_exist(
    State(st): State<Arc<AppState>>,
    Path((cluster_id, topic)): Path<(i64, String)>,
    Query(q): Query<WindowQuery>,
) -> Response {
    let (start, end) = match window(&q) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    let exists = match q.app_id.as_deref() {
        Some(app_id) => {
            st.connections
                .is_exist_connection_for_app(cluster_id, &topic, app_id, start, end)
                .await
        }
        None => {
            st.connections
                .is_exist_connection(cluster_id, &topic, start, end)
                .await
        }
    };

    (StatusCode::OK, Json(ExistsResponse { exists })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/apps/:app_id/connections
// ---------------------------------------------------------------------------

pub(crate) async fn app_connections(
    State(st): State<Arc<AppState>>,
    Path(app_id): Path<String>,
    Query(q): Query<WindowQuery>,
) -> Response {
    let (start, end) = match window(&q) {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    let connections = st.connections.get_by_app(&app_id, start, end).await;
    (StatusCode::OK, Json(ConnectionsResponse { connections })).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/connections/batch
// ---------------------------------------------------------------------------

pub(crate) async fn batch_add(
    State(st): State<Arc<AppState>>,
    Json(records): Json<Vec<RawConnectionRecord>>,
) -> impl IntoResponse {
    let succeeded = st.connections.batch_add(&records).await;
    (
        StatusCode::OK,
        Json(BatchAddResponse {
            total: records.len(),
            succeeded,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET/PUT /v1/clusters/:cluster_id/brokers
// ---------------------------------------------------------------------------

pub(crate) async fn get_brokers(
    State(st): State<Arc<AppState>>,
    Path(cluster_id): Path<i64>,
) -> impl IntoResponse {
    let set = st.connections.brokers().addresses_for(Some(cluster_id)).await;
    (
        StatusCode::OK,
        Json(BrokersResponse {
            cluster_id,
            addresses: set.iter().map(str::to_string).collect(),
        }),
    )
}

/// Replaces the cluster's broker snapshot. Reads already in flight keep the
/// snapshot they started with.
pub(crate) async fn put_brokers(
    State(st): State<Arc<AppState>>,
    Path(cluster_id): Path<i64>,
    Json(addresses): Json<Vec<String>>,
) -> impl IntoResponse {
    let set: BrokerAddressSet = addresses.into_iter().collect();
    let count = set.len();
    let addresses: Vec<String> = set.iter().map(str::to_string).collect();

    st.connections.brokers().replace(cluster_id, set).await;
    info!(cluster_id, count, "brokers/replace");

    (
        StatusCode::OK,
        Json(BrokersResponse {
            cluster_id,
            addresses,
        }),
    )
}
