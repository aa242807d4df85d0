//! Search handlers

use crate::AppState;
use axum::{extract::State, Json};
use linkstash_common::{
    auth::OwnerContext,
    errors::{AppError, Result},
    models::DocumentSummary,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 500))]
    pub query: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<DocumentSummary>,
    pub count: usize,
}

/// Relevance-ranked search over the caller's bookmarks
pub async fn search(
    State(state): State<AppState>,
    ctx: OwnerContext,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let results: Vec<DocumentSummary> = state
        .store
        .search(&request.query, ctx.owner_id())
        .await
        .iter()
        .map(|doc| doc.to_summary())
        .collect();

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}
