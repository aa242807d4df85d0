//! Chat handler: answers questions grounded in the caller's bookmarks

use crate::AppState;
use axum::{extract::State, Json};
use linkstash_common::{
    auth::OwnerContext,
    errors::{AppError, Result},
    models::ContextEntry,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,

    /// Override for the number of bookmark snippets fed to the model
    #[serde(default)]
    pub context_limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SourceRef {
    pub document_id: String,
    pub title: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Answer one chat message using relevant bookmark content as grounding.
///
/// Context retrieval is best-effort; when nothing matches the model is told
/// so and answers without grounding rather than the request failing.
pub async fn chat(
    State(state): State<AppState>,
    ctx: OwnerContext,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("message".to_string()),
    })?;

    let limit = request
        .context_limit
        .unwrap_or(state.config.chat.context_limit);
    let entries = state
        .store
        .relevant_context(&request.message, ctx.owner_id(), limit)
        .await;

    let system_prompt = build_system_prompt(&entries);
    let answer = state.chat.complete(&system_prompt, &request.message).await?;

    let sources = entries
        .into_iter()
        .map(|entry| SourceRef {
            document_id: entry.document_id,
            title: entry.title,
            url: entry.url,
        })
        .collect();

    Ok(Json(ChatResponse { answer, sources }))
}

fn build_system_prompt(entries: &[ContextEntry]) -> String {
    if entries.is_empty() {
        return "You are Linkstash, an assistant that answers questions about the \
                user's saved bookmarks. No saved bookmarks matched this question; \
                say so if the question depends on them."
            .to_string();
    }

    let mut prompt = String::from(
        "You are Linkstash, an assistant that answers questions about the user's \
         saved bookmarks. Ground your answer in the excerpts below and cite them \
         by title.\n\n",
    );
    for (index, entry) in entries.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] {} ({})\n{}\n\n",
            index + 1,
            entry.title,
            entry.url,
            entry.content
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_sources() {
        let entries = vec![ContextEntry {
            document_id: "d1".into(),
            title: "Rust book".into(),
            url: "https://example.com/rust".into(),
            content: "ownership and borrowing".into(),
            score: 10,
        }];

        let prompt = build_system_prompt(&entries);
        assert!(prompt.contains("[1] Rust book (https://example.com/rust)"));
        assert!(prompt.contains("ownership and borrowing"));
    }

    #[test]
    fn test_prompt_without_context_mentions_absence() {
        let prompt = build_system_prompt(&[]);
        assert!(prompt.contains("No saved bookmarks matched"));
    }
}
