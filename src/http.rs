//! HTTP surface: the fetch (sync) endpoint and the admin actions.
//!
//! | Method | Path                     | Effect                                   |
//! |--------|--------------------------|------------------------------------------|
//! | POST   | `/fetch/`                | refresh hint counts, 303 to `redirect_to` |
//! | GET    | `/indexes/`              | list bookkeeping rows                    |
//! | POST   | `/indexes/{action}/`     | `clear`, `rebuild` or `update` documents  |
//!
//! Bookkeeping rows are read-only here: nothing creates, edits or deletes
//! them except fetch and the actions.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use solrdoc_admin::{
    fetch_indexes, ActionMessage, IndexAdmin, IndexRecord, IndexRecordStore, MessageLevel,
    RecordSource, LIST_DISPLAY,
};
use solrdoc_core::{IndexRegistry, SearchBackend};
use tracing::{error, info};

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppState {
    pub registry: IndexRegistry,
    pub backends: Vec<Arc<dyn SearchBackend>>,
    pub source: Arc<dyn RecordSource>,
    pub store: Arc<dyn IndexRecordStore>,
    pub redirect_to: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexList {
    pub columns: [&'static str; 4],
    pub rows: Vec<IndexRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/fetch/", post(fetch))
        .route("/indexes/", get(list_indexes))
        .route("/indexes/{action}/", post(run_action))
        .with_state(state)
}

async fn fetch(State(state): State<Arc<AppState>>) -> Response {
    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        fetch_indexes(&worker.registry, &worker.backends, worker.store.as_ref())
    })
    .await;
    match result {
        Ok(Ok(summary)) => {
            info!(created = summary.created, updated = summary.updated, "fetch complete");
            Redirect::to(&state.redirect_to).into_response()
        }
        Ok(Err(err)) => {
            error!(%err, "fetch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(join) => error_response(StatusCode::INTERNAL_SERVER_ERROR, join.to_string()),
    }
}

async fn list_indexes(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list() {
        Ok(rows) => Json(IndexList {
            columns: LIST_DISPLAY,
            rows,
        })
        .into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

async fn run_action(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Response {
    if !matches!(action.as_str(), "clear" | "rebuild" | "update") {
        return error_response(StatusCode::NOT_FOUND, format!("unknown action: {action}"));
    }
    let result = tokio::task::spawn_blocking(move || -> solrdoc_admin::Result<ActionMessage> {
        let admin = IndexAdmin::new(
            &state.registry,
            &state.backends,
            state.source.as_ref(),
            state.store.as_ref(),
        );
        let selected = admin.select(&request.documents)?;
        Ok(match action.as_str() {
            "clear" => admin.clear_indexes(selected),
            "rebuild" => admin.rebuild_indexes(selected),
            _ => admin.update_indexes(selected),
        })
    })
    .await;
    match result {
        Ok(Ok(message)) => {
            let status = match message.level {
                MessageLevel::Info => StatusCode::OK,
                MessageLevel::Error => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(message)).into_response()
        }
        Ok(Err(err)) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        Err(join) => error_response(StatusCode::INTERNAL_SERVER_ERROR, join.to_string()),
    }
}
