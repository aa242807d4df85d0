//! Linkstash document store
//!
//! Single authority for document lifecycle and query within one process.
//! Owns a per-owner in-memory cache, mediates all reads/writes/deletes,
//! reconciles the cache against the append-only permanent store via deletion
//! tombstones, and answers relevance-ranked search queries.

pub mod permastore;
pub mod store;

pub use permastore::{HttpPermaStore, MemoryPermaStore, PermaStore, UploadReceipt};
pub use store::DocumentStore;
