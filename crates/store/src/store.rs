//! The document store: per-owner cache, tombstone reconciliation, search
//!
//! One `DocumentStore` instance is constructed by the application's
//! composition root and shared by handle; there is no ambient global state.
//! The cache is a nested container (owner -> insertion-ordered document map)
//! guarded by a single RwLock, which is the only concurrency control this
//! design requires: the permanent store is the durable source of truth and
//! the cache is local and best-effort.

use crate::permastore::PermaStore;
use chrono::Utc;
use indexmap::IndexMap;
use linkstash_common::errors::{AppError, Result};
use linkstash_common::metrics;
use linkstash_common::models::{
    CollectionStats, ContextEntry, DeletionRecord, Document, DocumentStatus, DocumentSummary,
    Owner,
};
use linkstash_common::{CONTEXT_SNIPPET_CHARS, SEARCH_RESULT_CAP};
use linkstash_scrape::{validate_url, PageScraper};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

// Additive field weights for substring relevance scoring
const WEIGHT_TITLE: u32 = 10;
const WEIGHT_SUMMARY: u32 = 5;
const WEIGHT_TAGS: u32 = 4;
const WEIGHT_URL: u32 = 3;
const WEIGHT_CONTENT: u32 = 2;

/// Cache key: `None` is the legacy unscoped slice
type OwnerKey = Option<String>;

/// One owner's slice of the cache
#[derive(Default)]
struct OwnerSlice {
    /// Insertion-ordered so search ties stay deterministic
    documents: IndexMap<String, Document>,

    /// Document ids known to be tombstoned; re-applied on every list so an
    /// entry cached before its tombstone existed still gets evicted
    tombstones: HashSet<String>,
}

impl OwnerSlice {
    fn apply_tombstones(&mut self) {
        let OwnerSlice {
            documents,
            tombstones,
        } = self;
        documents.retain(|id, _| !tombstones.contains(id));
    }

    fn active_docs(&self) -> impl Iterator<Item = &Document> {
        self.documents
            .values()
            .filter(|doc| !self.tombstones.contains(&doc.id))
    }

    fn lookup(&self, id: &str) -> Option<&Document> {
        self.documents
            .get(id)
            .filter(|_| !self.tombstones.contains(id))
    }
}

/// Single authority for document lifecycle and query within one process
pub struct DocumentStore {
    scraper: Arc<dyn PageScraper>,
    remote: Arc<dyn PermaStore>,
    // Insertion-ordered at both levels so unscoped listings and equal-score
    // search ties stay deterministic across runs
    cache: RwLock<IndexMap<OwnerKey, OwnerSlice>>,
}

impl DocumentStore {
    pub fn new(scraper: Arc<dyn PageScraper>, remote: Arc<dyn PermaStore>) -> Self {
        Self {
            scraper,
            remote,
            cache: RwLock::new(IndexMap::new()),
        }
    }

    /// Scrape a URL, upload the document to the permanent store, and cache it.
    ///
    /// Any failure in validation, extraction, or upload aborts the whole
    /// operation; nothing is cached and no partial document is persisted.
    pub async fn add(&self, url: &str, owner: Option<&Owner>) -> Result<DocumentSummary> {
        validate_url(url)?;

        let page = self.scraper.scrape(url).await?;

        let mut doc = Document {
            id: Document::generate_id(),
            owner_id: owner.map(|o| o.id.clone()),
            url: url.to_string(),
            title: page.title,
            content: page.content,
            summary: page.summary,
            metadata: page.metadata,
            metrics: page.metrics,
            remote_id: None,
            remote_url: None,
            status: DocumentStatus::Processing,
            added_at: Utc::now(),
            stored_at: None,
        };

        let receipt = self.remote.upload_document(&doc).await?;
        doc.remote_id = Some(receipt.remote_id);
        doc.remote_url = Some(receipt.remote_url);
        doc.status = DocumentStatus::Stored;
        doc.stored_at = Some(receipt.timestamp);

        let key: OwnerKey = doc.owner_id.clone();
        let summary = doc.to_summary();

        let mut cache = self.cache.write().await;
        let slice = cache.entry(key).or_default();
        slice.documents.insert(doc.id.clone(), doc);

        metrics::record_bookmark_added(&summary.metadata.domain);
        tracing::info!(
            id = %summary.id,
            url = %summary.url,
            owner = owner.map(|o| o.id.as_str()).unwrap_or("none"),
            "Bookmark stored"
        );

        Ok(summary)
    }

    /// List an owner's documents, triggering a full reload when the cache is
    /// empty. Without an owner (legacy mode) the entire process-wide cache is
    /// returned unfiltered; that is a deliberately permissive fallback, not a
    /// security boundary.
    pub async fn list(&self, owner: Option<&str>) -> (Vec<DocumentSummary>, CollectionStats) {
        let key: OwnerKey = owner.map(String::from);

        {
            let mut cache = self.cache.write().await;
            match owner {
                Some(_) => {
                    if let Some(slice) = cache.get_mut(&key) {
                        slice.apply_tombstones();
                        if !slice.documents.is_empty() {
                            metrics::record_cache(true);
                            let docs: Vec<&Document> = slice.documents.values().collect();
                            return Self::project(&docs);
                        }
                    }
                }
                None => {
                    for slice in cache.values_mut() {
                        slice.apply_tombstones();
                    }
                    if cache.values().any(|s| !s.documents.is_empty()) {
                        metrics::record_cache(true);
                        let docs: Vec<&Document> =
                            cache.values().flat_map(|s| s.documents.values()).collect();
                        return Self::project(&docs);
                    }
                }
            }
        }

        metrics::record_cache(false);
        let docs = self.reload(owner).await;
        let refs: Vec<&Document> = docs.iter().collect();
        Self::project(&refs)
    }

    /// Fully resynchronize an owner's cache slice from the permanent store,
    /// subtracting the deletion set from the insertion set.
    ///
    /// Fail-soft: on a remote query failure this returns an empty list and
    /// leaves any existing cache for the owner untouched, so a transient
    /// outage neither erases a warm cache nor crashes the caller.
    pub async fn reload(&self, owner: Option<&str>) -> Vec<Document> {
        let documents = match self.remote.query_documents(owner).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(owner = owner.unwrap_or("none"), error = %e, "Document reload failed");
                return Vec::new();
            }
        };

        // Without the deletion set the cache cannot be reconciled safely:
        // treat this the same as a failed document query rather than
        // resurrecting deleted entries.
        let deletions = match self.remote.query_deletions(owner).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(owner = owner.unwrap_or("none"), error = %e, "Tombstone reload failed");
                return Vec::new();
            }
        };

        let tombstones: HashSet<String> =
            deletions.into_iter().map(|r| r.document_id).collect();

        let active: Vec<Document> = documents
            .into_iter()
            .filter(|doc| !tombstones.contains(&doc.id))
            .collect();

        let key: OwnerKey = owner.map(String::from);
        let mut cache = self.cache.write().await;
        let slice = cache.entry(key).or_default();
        slice.documents = active
            .iter()
            .map(|doc| (doc.id.clone(), doc.clone()))
            .collect();
        slice.tombstones = tombstones;

        tracing::debug!(
            owner = owner.unwrap_or("none"),
            count = active.len(),
            "Cache slice reloaded"
        );

        active
    }

    /// Get a cached document by id. Does not fall back to a remote fetch;
    /// `reload` is the only path that populates from remote.
    pub async fn get(&self, id: &str, owner: Option<&str>) -> Result<Document> {
        let key: OwnerKey = owner.map(String::from);
        let cache = self.cache.read().await;

        if let Some(doc) = cache.get(&key).and_then(|s| s.lookup(id)) {
            return Ok(doc.clone());
        }

        // Documents added before auth existed live in the legacy slice
        if key.is_some() {
            if let Some(doc) = cache.get(&None).and_then(|s| s.lookup(id)) {
                return Ok(doc.clone());
            }
        }

        Err(AppError::DocumentNotFound { id: id.to_string() })
    }

    /// Relevance-ranked substring search over the cached documents.
    /// Cache-only, no remote fallback; capped at the top 10.
    pub async fn search(&self, query: &str, owner: Option<&str>) -> Vec<Document> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let key: OwnerKey = owner.map(String::from);
        let cache = self.cache.read().await;

        let candidates: Vec<&Document> = match owner {
            Some(_) => cache
                .get(&key)
                .map(|s| s.active_docs().collect())
                .unwrap_or_default(),
            None => cache.values().flat_map(|s| s.active_docs()).collect(),
        };

        let mut scored: Vec<(u32, &Document)> = candidates
            .into_iter()
            .filter_map(|doc| {
                let score = score_document(doc, &needle);
                (score > 0).then_some((score, doc))
            })
            .collect();

        // Stable sort keeps insertion order on ties
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(SEARCH_RESULT_CAP);

        let results: Vec<Document> = scored.into_iter().map(|(_, doc)| doc.clone()).collect();
        metrics::record_search(start.elapsed().as_secs_f64(), results.len());
        results
    }

    /// Tombstone a document in the permanent store, then evict it locally.
    ///
    /// Fail-closed: if the tombstone write fails the cache entry is retained
    /// and the error surfaced. Locally hiding a document that is not durably
    /// deleted would just let a future reload resurrect it.
    pub async fn remove(&self, id: &str, owner: Option<&Owner>) -> Result<()> {
        let owner = owner.ok_or_else(|| AppError::AuthRequired {
            message: "deleting a bookmark requires an authenticated owner".to_string(),
        })?;
        let key: OwnerKey = Some(owner.id.clone());

        // Resolve before the network call, without holding the lock across it
        let slice_key: OwnerKey = {
            let cache = self.cache.read().await;
            if cache.get(&key).is_some_and(|s| s.lookup(id).is_some()) {
                key.clone()
            } else if cache.get(&None).is_some_and(|s| s.lookup(id).is_some()) {
                None
            } else {
                return Err(AppError::DocumentNotFound { id: id.to_string() });
            }
        };

        let record = DeletionRecord {
            document_id: id.to_string(),
            owner_id: owner.id.clone(),
            deleted_at: Utc::now(),
        };

        // Durable tombstone first; local state untouched on failure
        self.remote.upload_deletion(&record).await?;

        let mut cache = self.cache.write().await;
        if let Some(slice) = cache.get_mut(&slice_key) {
            slice.documents.shift_remove(id);
        }
        cache.entry(key).or_default().tombstones.insert(id.to_string());

        metrics::record_bookmark_removed();
        tracing::info!(id = %id, owner = %owner.id, "Bookmark tombstoned");
        Ok(())
    }

    /// Search hits with content truncated for LLM context. Best-effort: this
    /// path feeds the chat feature and degrades to an empty list rather than
    /// failing the caller.
    pub async fn relevant_context(
        &self,
        query: &str,
        owner: Option<&str>,
        limit: usize,
    ) -> Vec<ContextEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.search(query, owner)
            .await
            .into_iter()
            .take(limit)
            .map(|doc| ContextEntry {
                score: score_document(&doc, &needle),
                content: doc.content.chars().take(CONTEXT_SNIPPET_CHARS).collect(),
                document_id: doc.id,
                title: doc.title,
                url: doc.url,
            })
            .collect()
    }

    fn project(docs: &[&Document]) -> (Vec<DocumentSummary>, CollectionStats) {
        let summaries = docs.iter().map(|d| d.to_summary()).collect();

        let total_words: usize = docs.iter().map(|d| d.metrics.word_count).sum();
        let total_chars: usize = docs.iter().map(|d| d.metrics.content_length).sum();
        let domains: HashSet<&str> = docs.iter().map(|d| d.metadata.domain.as_str()).collect();
        let stats = CollectionStats {
            document_count: docs.len(),
            total_words,
            total_chars,
            distinct_domains: domains.len(),
            avg_words_per_document: if docs.is_empty() {
                0.0
            } else {
                total_words as f64 / docs.len() as f64
            },
        };

        (summaries, stats)
    }
}

/// Case-insensitive substring match over five fields with fixed additive
/// weights; a document's score is the sum of all matching field weights.
fn score_document(doc: &Document, needle: &str) -> u32 {
    let mut score = 0;

    if doc.title.to_lowercase().contains(needle) {
        score += WEIGHT_TITLE;
    }
    if doc.summary.to_lowercase().contains(needle) {
        score += WEIGHT_SUMMARY;
    }
    if doc
        .metadata
        .tags
        .iter()
        .any(|tag| tag.to_lowercase().contains(needle))
    {
        score += WEIGHT_TAGS;
    }
    if doc.url.to_lowercase().contains(needle)
        || doc.metadata.domain.to_lowercase().contains(needle)
    {
        score += WEIGHT_URL;
    }
    if doc.content.to_lowercase().contains(needle) {
        score += WEIGHT_CONTENT;
    }

    score
}
