use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{FeedPage, UserId},
    routes::AppState,
    services::strategies::StrategyFilters,
};

/// Header carrying the authenticated user id
///
/// Authentication itself is an upstream collaborator; by the time a request
/// lands here the gateway has already verified the session and injected this
/// header.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub language: Option<String>,
    pub category: Option<String>,
}

/// Handler for the recommended main feed
pub async fn main_feed(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let user_id = user_id_from_headers(&headers)?;
    let limit = clamp_limit(params.limit, state.as_ref());
    let cursor = params.cursor.as_deref().filter(|c| !c.is_empty());
    let filters = StrategyFilters {
        language: params.language,
        category: params.category,
    };

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        cursor = ?cursor,
        limit,
        "Serving main feed"
    );

    let page = state.feed.main_feed(user_id, cursor, limit, &filters).await?;
    Ok(Json(page))
}

/// Handler for the chronological following feed
pub async fn following_feed(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    Query(params): Query<FeedQuery>,
) -> AppResult<Json<FeedPage>> {
    let user_id = user_id_from_headers(&headers)?;
    let limit = clamp_limit(params.limit, state.as_ref());
    let cursor = params.cursor.as_deref().filter(|c| !c.is_empty());

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        cursor = ?cursor,
        limit,
        "Serving following feed"
    );

    let page = state.feed.following_feed(user_id, cursor, limit).await?;
    Ok(Json(page))
}

fn user_id_from_headers(headers: &HeaderMap) -> AppResult<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Missing or invalid {} header", USER_ID_HEADER))
        })
}

fn clamp_limit(limit: Option<usize>, state: &AppState) -> usize {
    limit
        .unwrap_or(state.config.default_limit)
        .clamp(1, state.config.max_limit)
}
