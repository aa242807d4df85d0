//! Domain models for Linkstash
//!
//! A `Document` is an immutable snapshot of a scraped bookmark. Deletion is
//! modeled as data (`DeletionRecord`) because the backing permanent store is
//! append-only and cannot remove entries in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a document.
///
/// Documents are only ever cached in the `Stored` state: a failed scrape or
/// upload aborts the whole add operation and nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Stored,
    Failed,
}

/// Page metadata supplied by the scraper, treated as opaque payload by the
/// document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Host of the bookmarked URL
    pub domain: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Publish date as found on the page, unparsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Size metrics computed at scrape time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub word_count: usize,
    pub content_length: usize,
}

/// A stored bookmark document. Immutable once `Stored`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique within an owner's collection, generated at creation time
    pub id: String,

    /// Owning user; `None` only in legacy unscoped mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub url: String,
    pub title: String,

    /// Full extracted text
    pub content: String,

    /// Derived, bounded-length summary
    pub summary: String,

    pub metadata: DocumentMetadata,
    pub metrics: DocumentMetrics,

    /// Identifier returned by the permanent store upon upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    /// Dereferenceable locator for `remote_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    pub status: DocumentStatus,

    pub added_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Generate a new document id: millisecond timestamp plus a random suffix.
    pub fn generate_id() -> String {
        let suffix: u32 = rand::random::<u32>() & 0x00ff_ffff;
        format!("{}-{:06x}", Utc::now().timestamp_millis(), suffix)
    }

    /// Bounded projection returned to callers; never includes full content.
    pub fn to_summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            summary: self.summary.clone(),
            remote_id: self.remote_id.clone(),
            remote_url: self.remote_url.clone(),
            added_at: self.added_at,
            metrics: self.metrics,
            metadata: self.metadata.clone(),
        }
    }
}

/// The projection of a `Document` exposed over the API.
///
/// Excludes `content` to bound response size, and `status`, which is an
/// internal lifecycle detail (every cached document is `Stored`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    pub added_at: DateTime<Utc>,
    pub metrics: DocumentMetrics,
    pub metadata: DocumentMetadata,
}

/// Durable marker recording that a document id is logically deleted.
///
/// Written to the same append-only store as documents; every read path that
/// assembles current state must subtract the deletion set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub document_id: String,
    pub owner_id: String,
    pub deleted_at: DateTime<Utc>,
}

/// Aggregate statistics over an owner's active documents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub document_count: usize,
    pub total_words: usize,
    pub total_chars: usize,
    pub distinct_domains: usize,
    pub avg_words_per_document: f64,
}

/// An authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Stable identifier derived from the verified email address
    pub id: String,
    pub email: String,
}

/// A search hit handed to the chat feature, with content truncated to a
/// bounded prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub document_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Document::generate_id();
        let b = Document::generate_id();
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }

    #[test]
    fn test_summary_excludes_content() {
        let doc = Document {
            id: "1".into(),
            owner_id: Some("u1".into()),
            url: "https://example.com/a".into(),
            title: "Example".into(),
            content: "full text".into(),
            summary: "short".into(),
            metadata: DocumentMetadata::default(),
            metrics: DocumentMetrics {
                word_count: 2,
                content_length: 9,
            },
            remote_id: Some("r1".into()),
            remote_url: Some("https://store.example/r1".into()),
            status: DocumentStatus::Stored,
            added_at: Utc::now(),
            stored_at: Some(Utc::now()),
        };

        let summary = doc.to_summary();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("content").is_none());
        assert!(json.get("status").is_none());
        assert_eq!(json["id"], "1");
        assert_eq!(json["metrics"]["word_count"], 2);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentStatus::Stored).unwrap();
        assert_eq!(json, "\"stored\"");
    }
}
