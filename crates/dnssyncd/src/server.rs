//! external-dns webhook HTTP surface
//!
//! ```text
//! GET  /                 capabilities
//! GET  /records          list managed endpoints
//! POST /records          apply a change set
//! POST /adjustendpoints  pass-through
//! GET  /healthz          liveness
//! ```
//!
//! Handlers only decode, delegate to [`SyncEngine`] and encode.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use dnssync_core::{Changes, Endpoint, SyncEngine};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Media type negotiated with external-dns
pub const WEBHOOK_MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

/// Application state shared between handlers
pub struct AppState {
    /// Reconciliation engine
    pub engine: SyncEngine,
    /// Cancelled on shutdown; aborts in-flight listings
    pub shutdown: CancellationToken,
}

/// Build the webhook router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(negotiate))
        .route("/records", get(get_records).post(apply_changes))
        .route("/adjustendpoints", axum::routing::post(adjust_endpoints))
        .route("/healthz", get(healthz))
        .with_state(state)
}

fn webhook_json<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, WEBHOOK_MEDIA_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Handler for `GET /`.
pub async fn negotiate(State(state): State<Arc<AppState>>) -> Response {
    webhook_json(&state.engine.capabilities())
}

/// Handler for `GET /records`.
///
/// Any failed (zone, type) request fails the whole answer: a partial list
/// would read as "these records do not exist" to external-dns.
pub async fn get_records(State(state): State<Arc<AppState>>) -> Response {
    let listing = state
        .engine
        .list_records_with_cancel(state.shutdown.child_token())
        .await;

    match listing.into_result() {
        Ok(endpoints) => {
            debug!("Returning {} endpoint(s)", endpoints.len());
            webhook_json(&endpoints)
        }
        Err(e) => {
            error!("Failed to list records: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to retrieve records: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for `POST /records`.
pub async fn apply_changes(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let changes: Changes = match serde_json::from_slice(&body) {
        Ok(changes) => changes,
        Err(e) => {
            warn!("Rejecting malformed change set: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Bad Request: {}", e)).into_response();
        }
    };

    match state.engine.apply_changes(&changes).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handler for `POST /adjustendpoints`.
pub async fn adjust_endpoints(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let endpoints: Vec<Endpoint> = match serde_json::from_slice(&body) {
        Ok(endpoints) => endpoints,
        Err(e) => {
            warn!("Rejecting malformed endpoint list: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Bad Request: {}", e)).into_response();
        }
    };
    webhook_json(&state.engine.adjust_endpoints(endpoints))
}

/// Handler for `GET /healthz`.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
