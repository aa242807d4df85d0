//! Permanent storage network client
//!
//! The storage network is append-only: nothing uploaded can be removed in
//! place. Deleting a bookmark therefore means uploading a `DeletionRecord`
//! to the same store; read paths subtract the deletion set at query time.
//!
//! Every upload carries the tag triple (app name, doc type, owner id) and
//! every query filters on it. The tag names must stay stable across upload
//! and query or previously stored documents become invisible.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkstash_common::errors::{AppError, Result};
use linkstash_common::models::{DeletionRecord, Document, DocumentStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

pub use http::HttpPermaStore;

/// Tag convention attached on every upload and used on every query
pub mod tags {
    pub const APP_NAME: &str = "App-Name";
    pub const APP_VALUE: &str = "linkstash";

    pub const DOC_TYPE: &str = "Doc-Type";
    pub const TYPE_BOOKMARK: &str = "bookmark";
    pub const TYPE_DELETION: &str = "deletion-record";

    pub const OWNER_ID: &str = "Owner-Id";
    /// Owner tag value for legacy unscoped uploads
    pub const OWNER_NONE: &str = "none";
}

/// Receipt returned by the store upon successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub remote_id: String,
    pub remote_url: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only permanent store collaborator.
///
/// Query failure means "no data", never "no documents exist": callers must
/// not treat a failed query as an empty collection.
#[async_trait]
pub trait PermaStore: Send + Sync {
    /// Upload a document; fails on network or signing error.
    async fn upload_document(&self, document: &Document) -> Result<UploadReceipt>;

    /// Upload a deletion tombstone for a document.
    async fn upload_deletion(&self, record: &DeletionRecord) -> Result<UploadReceipt>;

    /// All documents tagged with this owner (legacy unscoped when `None`).
    async fn query_documents(&self, owner_id: Option<&str>) -> Result<Vec<Document>>;

    /// All deletion records for this owner.
    async fn query_deletions(&self, owner_id: Option<&str>) -> Result<Vec<DeletionRecord>>;
}

fn owner_tag_value(owner_id: Option<&str>) -> String {
    owner_id.unwrap_or(tags::OWNER_NONE).to_string()
}

/// One stored entry in the in-memory store
enum MemoryEntry {
    Document(Document),
    Deletion(DeletionRecord),
}

/// In-process append-only store honoring the same tag filtering as the real
/// network. Backs the test suites and offline development.
///
/// Fault injection switches simulate network outages so the fail-soft and
/// fail-closed paths of the document store can be exercised.
#[derive(Default)]
pub struct MemoryPermaStore {
    entries: RwLock<Vec<(String, MemoryEntry)>>,
    fail_uploads: AtomicBool,
    fail_queries: AtomicBool,
}

impl MemoryPermaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent uploads fail, simulating an unreachable network
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent queries fail
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn receipt() -> UploadReceipt {
        let remote_id = Uuid::new_v4().to_string();
        UploadReceipt {
            remote_url: format!("memory://{}", remote_id),
            remote_id,
            timestamp: Utc::now(),
        }
    }
}

#[async_trait]
impl PermaStore for MemoryPermaStore {
    async fn upload_document(&self, document: &Document) -> Result<UploadReceipt> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Upload {
                message: "storage network unreachable (injected)".to_string(),
            });
        }

        let receipt = Self::receipt();

        // The store assigns the remote identifier; keep the stored copy
        // consistent with what the caller will cache.
        let mut stored = document.clone();
        stored.remote_id = Some(receipt.remote_id.clone());
        stored.remote_url = Some(receipt.remote_url.clone());
        stored.status = DocumentStatus::Stored;
        stored.stored_at = Some(receipt.timestamp);

        let owner_tag = owner_tag_value(stored.owner_id.as_deref());
        self.entries
            .write()
            .await
            .push((owner_tag, MemoryEntry::Document(stored)));

        Ok(receipt)
    }

    async fn upload_deletion(&self, record: &DeletionRecord) -> Result<UploadReceipt> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Upload {
                message: "storage network unreachable (injected)".to_string(),
            });
        }

        let receipt = Self::receipt();
        self.entries
            .write()
            .await
            .push((record.owner_id.clone(), MemoryEntry::Deletion(record.clone())));

        Ok(receipt)
    }

    async fn query_documents(&self, owner_id: Option<&str>) -> Result<Vec<Document>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::RemoteQuery {
                message: "storage network unreachable (injected)".to_string(),
            });
        }

        let wanted = owner_tag_value(owner_id);
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(tag, _)| *tag == wanted)
            .filter_map(|(_, entry)| match entry {
                MemoryEntry::Document(doc) => Some(doc.clone()),
                MemoryEntry::Deletion(_) => None,
            })
            .collect())
    }

    async fn query_deletions(&self, owner_id: Option<&str>) -> Result<Vec<DeletionRecord>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::RemoteQuery {
                message: "storage network unreachable (injected)".to_string(),
            });
        }

        let wanted = owner_tag_value(owner_id);
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(tag, _)| *tag == wanted)
            .filter_map(|(_, entry)| match entry {
                MemoryEntry::Deletion(record) => Some(record.clone()),
                MemoryEntry::Document(_) => None,
            })
            .collect())
    }
}
