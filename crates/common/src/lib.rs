//! Linkstash Common Library
//!
//! Shared code for the Linkstash services including:
//! - Domain models (documents, deletion records, owners)
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities (email OTP + JWT)
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{DeletionRecord, Document, DocumentSummary, Owner};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of characters of document content handed to the chat
/// feature per context entry
pub const CONTEXT_SNIPPET_CHARS: usize = 2000;

/// Maximum number of results returned by a search
pub const SEARCH_RESULT_CAP: usize = 10;
