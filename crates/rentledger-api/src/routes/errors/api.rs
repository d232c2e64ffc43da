//! Error log API endpoints

use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rentledger_core::{ErrorLogEntry, ErrorLogStatus};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ErrorLogQuery {
    pub status: Option<ErrorLogStatus>,
}

pub async fn api_error_logs(
    State(state): State<AppState>,
    Query(query): Query<ErrorLogQuery>,
) -> Json<Vec<ErrorLogEntry>> {
    let manager = state.manager.read().await;
    Json(manager.error_logs(query.status).into_iter().cloned().collect())
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default = "default_resolution")]
    pub status: ErrorLogStatus,
    #[serde(default)]
    pub notes: String,
}

fn default_resolution() -> ErrorLogStatus {
    ErrorLogStatus::Resolved
}

pub async fn api_resolve_error(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<ErrorLogEntry> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.resolve_error(&id, request.status, &request.notes)?))
}
