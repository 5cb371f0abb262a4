//! Sync endpoint: an axum HTTP server exposing the whole task collection.
//!
//! Two routes, both concerning the entire collection:
//!
//! - `GET /get_tareas` returns the persisted collection (`[]` when there
//!   is none yet).
//! - `POST /update_tareas` replaces the collection with the request body
//!   and answers `{"status":"ok"}`. There is no merge: last writer wins.
//!
//! The endpoint is meant for a trusted LAN: no authentication, no TLS.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use endel_proto::wire::{self, FETCH_PATH, REPLACE_PATH, StatusAck};

use crate::store::TaskStore;

/// Default maximum accepted request body in bytes (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Shared endpoint state.
pub struct BridgeState {
    /// Store shared with the rest of the process.
    pub store: Arc<TaskStore>,
}

impl BridgeState {
    /// Wraps a store for use by the endpoint.
    #[must_use]
    pub const fn new(store: Arc<TaskStore>) -> Self {
        Self { store }
    }
}

/// Builds the endpoint router.
///
/// Request bodies above `max_payload_size` bytes are rejected with 413.
pub fn router(state: Arc<BridgeState>, max_payload_size: usize) -> Router {
    Router::new()
        .route(FETCH_PATH, get(fetch_tasks))
        .route(REPLACE_PATH, post(replace_tasks))
        .layer(DefaultBodyLimit::max(max_payload_size))
        .with_state(state)
}

/// Binds `addr` and serves the endpoint on a background task.
///
/// Returns the bound address (useful with port 0) and the server task
/// handle; abort the handle to stop serving.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<BridgeState>,
    max_payload_size: usize,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let app = router(state, max_payload_size);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "sync endpoint error");
        }
    });

    Ok((bound_addr, handle))
}

/// `GET /get_tareas`: the collection exactly as persisted.
async fn fetch_tasks(State(state): State<Arc<BridgeState>>) -> Response {
    let bytes = match state.store.raw_bytes().await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => b"[]".to_vec(),
        Err(e) => {
            tracing::error!(error = %e, "fetch: failed to read task file");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    // Never hand a peer something it would reject.
    if let Err(e) = wire::decode_collection(&bytes) {
        tracing::warn!(error = %e, "fetch: task file is corrupt");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("task file is corrupt: {e}"),
        );
    }

    tracing::info!(bytes = bytes.len(), "fetch served");
    ([(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// `POST /update_tareas`: wholesale replace.
async fn replace_tasks(State(state): State<Arc<BridgeState>>, body: Bytes) -> Response {
    let tasks = match wire::decode_collection(&body) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "replace: rejected payload");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    match state.store.replace(&tasks).await {
        Ok(()) => (StatusCode::OK, Json(StatusAck::ok())).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "replace: failed to persist");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(StatusAck::error(message))).into_response()
}
