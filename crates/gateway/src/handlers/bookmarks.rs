//! Bookmark lifecycle handlers
//!
//! All four operations delegate to the document store; the handlers only
//! shape requests and responses. Owner scoping comes from the `OwnerContext`
//! extractor: no Authorization header means legacy unscoped mode.

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use linkstash_common::{
    auth::OwnerContext,
    errors::{AppError, Result},
    models::{CollectionStats, Document, DocumentSummary},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to bookmark a URL
#[derive(Debug, Deserialize, Validate)]
pub struct AddBookmarkRequest {
    #[validate(url)]
    pub url: String,
}

#[derive(Serialize)]
pub struct ListBookmarksResponse {
    pub bookmarks: Vec<DocumentSummary>,
    pub stats: CollectionStats,
}

/// Scrape and store a new bookmark
pub async fn add_bookmark(
    State(state): State<AppState>,
    ctx: OwnerContext,
    Json(request): Json<AddBookmarkRequest>,
) -> Result<(StatusCode, Json<DocumentSummary>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("url".to_string()),
    })?;

    let summary = state.store.add(&request.url, ctx.owner.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// List the caller's bookmarks with collection statistics
pub async fn list_bookmarks(
    State(state): State<AppState>,
    ctx: OwnerContext,
) -> Result<Json<ListBookmarksResponse>> {
    let (bookmarks, stats) = state.store.list(ctx.owner_id()).await;
    Ok(Json(ListBookmarksResponse { bookmarks, stats }))
}

/// Get one bookmark with its full content
pub async fn get_bookmark(
    State(state): State<AppState>,
    ctx: OwnerContext,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    let document = state.store.get(&id, ctx.owner_id()).await?;
    Ok(Json(document))
}

/// Tombstone a bookmark. Requires an authenticated owner.
pub async fn delete_bookmark(
    State(state): State<AppState>,
    ctx: OwnerContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.remove(&id, ctx.owner.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}
