//! Read-only report and history endpoints for the dashboard.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::analytics::types::HistoryEntry;
use crate::error::AppError;
use crate::repository::HistoryRepository;
use super::headers::CachePolicy;

/// Reports only change once per run.
const REPORT_CACHE: CachePolicy = CachePolicy {
    max_age: 300,
    stale_while_revalidate: 600,
};
const HISTORY_CACHE: CachePolicy = CachePolicy {
    max_age: 60,
    stale_while_revalidate: 300,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 12;
/// A year of weekly runs.
pub const MAX_HISTORY_LIMIT: usize = 52;

#[derive(Debug, Deserialize)]
pub struct LatestReportQuery {
    pub community: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub community: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub community: Option<String>,
    pub limit: usize,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommunitiesResponse {
    pub communities: Vec<String>,
}

fn to_body<T: Serialize>(value: &T) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(value).map_err(|err| AppError::Parse(err.to_string()))
}

/// `GET /reports/latest?community=`
pub async fn latest_report(
    State(repository): State<HistoryRepository>,
    Query(params): Query<LatestReportQuery>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let stored = repository
        .latest_report(&params.community)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No report for {}", params.community)))?;

    let body = to_body(&stored)?;
    Ok(REPORT_CACHE.respond(&request_headers, body, Some(stored.generated_at)))
}

/// `GET /history?community=&limit=`, newest first.
pub async fn history(
    State(repository): State<HistoryRepository>,
    Query(params): Query<HistoryQuery>,
    request_headers: HeaderMap,
) -> Result<Response, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let entries = match params.community.as_deref() {
        Some(community) => repository.recent_history(community, limit).await?,
        None => {
            let mut all = repository.fetch_history(None).await?;
            // Latest insert first among rows sharing a date.
            all.reverse();
            all.sort_by(|a, b| b.date.cmp(&a.date));
            all.truncate(limit);
            all
        }
    };

    let body = to_body(&HistoryResponse {
        community: params.community,
        limit,
        entries,
    })?;
    Ok(HISTORY_CACHE.respond(&request_headers, body, None))
}

/// `GET /communities`
pub async fn communities(
    State(repository): State<HistoryRepository>,
) -> Result<Json<CommunitiesResponse>, AppError> {
    let communities = repository.list_communities().await?;
    Ok(Json(CommunitiesResponse { communities }))
}
