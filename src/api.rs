//! Read-side HTTP API.
//!
//! | Route | Returns |
//! |-------|---------|
//! | `GET /api/today/{subreddit}` | audience snapshots since local midnight, oldest first |
//!
//! A malformed subreddit name is a `400`, a repository failure a `500`.

use crate::models::{AudienceSnapshot, ResourceId};
use crate::repository::SnapshotRepository;
use crate::utils::start_of_day;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, Utc};
use std::sync::Arc;
use tracing::{error, instrument, warn};

#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<dyn SnapshotRepository>,
}

pub fn router(repository: Arc<dyn SnapshotRepository>) -> Router {
    Router::new()
        .route("/api/today/", get(missing_resource))
        .route("/api/today/{resource}", get(today))
        .with_state(ApiState { repository })
}

async fn missing_resource() -> StatusCode {
    StatusCode::BAD_REQUEST
}

#[instrument(level = "info", skip_all)]
async fn today(
    State(state): State<ApiState>,
    Path(resource): Path<String>,
) -> Result<Json<Vec<AudienceSnapshot>>, StatusCode> {
    let resource = ResourceId::parse(&resource).map_err(|e| {
        warn!(%resource, error = %e, "Rejected subreddit name");
        StatusCode::BAD_REQUEST
    })?;

    let start = start_of_day(&Local::now());
    let end = Utc::now();

    let audiences = state
        .repository
        .find_audiences_between(&resource, start, end)
        .await
        .map_err(|e| {
            error!(%resource, error = %e, "Failed to load today's audiences");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(audiences))
}
