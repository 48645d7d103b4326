//! axum router and request handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use gitsvc_core::{Mirror, Snapshot};
use serde::Deserialize;
use tracing::instrument;

use crate::dispatch;
use crate::response::{Format, Negotiated};
use crate::AppError;

/// State shared by every handler
#[derive(Debug)]
pub struct AppState {
    pub mirror: Arc<Mirror>,
    pub snapshot: Snapshot,
}

impl AppState {
    /// Serve reads from the mirror's working copy
    pub fn new(mirror: Arc<Mirror>) -> Self {
        let snapshot = Snapshot::new(mirror.path());
        Self { mirror, snapshot }
    }
}

/// Build the axum [`Router`] with all routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/file", get(get_file))
        .route("/tree", get(get_tree))
        .route("/update", get(update))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub path: String,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    pub format: Option<String>,
}

/// Run blocking git/filesystem work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("blocking task failed: {e}")))
}

/// `GET /file?path=<relative>&format=json|yaml`
#[instrument(skip_all, fields(path = %query.path, format = ?query.format))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let format = Format::from_query(query.format.as_deref());
    let body = blocking(move || dispatch::get_file(&state, &query.path)).await??;
    Ok(Negotiated::new(format, body).into_response())
}

/// `GET /tree?format=json|yaml`
#[instrument(skip_all, fields(format = ?query.format))]
pub async fn get_tree(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, AppError> {
    let format = Format::from_query(query.format.as_deref());
    let body = blocking(move || dispatch::get_tree(&state)).await??;
    Ok(Negotiated::new(format, body).into_response())
}

/// `GET /update`
///
/// Always answers 200; a failed pull is reported in the message.
#[instrument(skip_all)]
pub async fn update(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let body = blocking(move || dispatch::update(&state)).await?;
    Ok(Negotiated::new(Format::Json, body).into_response())
}
