//! HTTP request handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rostergraph_core::Member;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub group: Option<String>,
}

/// Name and follower count of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSize {
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupsResponse {
    pub groups: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntersectResponse {
    pub members: Vec<Member>,
    pub intersected: usize,
    pub groups: Vec<GroupSize>,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Ingest a group: `GET /api/fetch?group=<slug>`
pub async fn fetch_group(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<GroupSize>, ApiError> {
    let group = params
        .group
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing required query parameter 'group'"))?;
    info!(group = %group, "fetch requested");

    let summary = state.service.fetch_group(&group, &state.shutdown).await?;
    if let Some(stop) = &summary.stop {
        warn!(group = %group, stop = %stop, "group fetched partially");
    }

    Ok(Json(GroupSize {
        name: summary.group,
        size: summary.size,
    }))
}

/// List ingested groups: `GET /api/groups`
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<GroupsResponse>, ApiError> {
    let groups = state.service.list_groups()?;
    Ok(Json(GroupsResponse { groups }))
}

/// Members common to every `q` group: `GET /api/intersect?q=a&q=b`
pub async fn intersect(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<IntersectResponse>, ApiError> {
    let groups: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "q")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if groups.is_empty() {
        return Err(ApiError::bad_request(
            "missing required query parameter 'q'",
        ));
    }
    info!(groups = ?groups, "intersection requested");

    let report = state.service.intersect(&groups).await?;
    let intersected = report.intersected();

    Ok(Json(IntersectResponse {
        members: report.members,
        intersected,
        groups: report
            .group_sizes
            .into_iter()
            .map(|(name, size)| GroupSize { name, size })
            .collect(),
    }))
}
