use super::ApiState;
use crate::error::ApiError;
use crate::informer::StatusReport;
use crate::store::StatusEntry;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Pending status as returned by the read endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub cluster: String,
    pub claim_ref: String,
    pub status_message: String,
    pub received_at: String,
}

impl From<StatusEntry> for StatusView {
    fn from(entry: StatusEntry) -> Self {
        Self {
            cluster: entry.cluster,
            claim_ref: entry.claim_ref,
            status_message: entry.status_message,
            received_at: entry.received_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

fn to_views(mut entries: Vec<StatusEntry>) -> Vec<StatusView> {
    entries.sort_by(|a, b| a.key().cmp(&b.key()));
    entries.into_iter().map(StatusView::from).collect()
}

pub(super) async fn post_status(
    State(state): State<ApiState>,
    body: Result<Json<StatusReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(report) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    report.validate()?;

    state
        .store
        .put(&report.cluster, &report.claim_ref, &report.status_message);
    debug!(
        cluster = %report.cluster,
        claim_ref = %report.claim_ref,
        "Recorded status report"
    );

    Ok((StatusCode::CREATED, Json(json!({ "status": "created" }))))
}

pub(super) async fn get_status(State(state): State<ApiState>) -> Json<Vec<StatusView>> {
    Json(to_views(state.store.get_all()))
}

pub(super) async fn get_status_by_cluster(
    State(state): State<ApiState>,
    Path(cluster): Path<String>,
) -> Json<Vec<StatusView>> {
    Json(to_views(state.store.get_cluster(&cluster)))
}

pub(super) async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(super) async fn version(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(json!({ "version": state.version, "commit": state.commit }))
}
