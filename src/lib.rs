//! # catalog-cache - Client-side Catalog Cache
//!
//! Keeps a local SQLite copy of a remote company catalog in step with the
//! upstream API and serves fast local reads on top of it.
//!
//! catalog-cache provides:
//! - Remote catalog client with cursor pagination, ETag revalidation and retry/backoff
//! - Validation layer with strict/safe contracts and a determinism check
//! - Sync engine with resumable per-resource passes and materialized facets
//! - Query engine for filtered full-text search, facets and company detail
//! - Workspace overlays (bookmarks, notes, comparisons, search history)

pub mod catalog;
pub mod facet;
pub mod sync_state;
pub mod workspace;
pub mod parse;
pub mod api;
pub mod storage;
pub mod sync;
pub mod query;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use catalog::{Company, CompanyAlias, DriftAlert, Evidence, ScoringRun, ServiceStats};
pub use facet::{FacetBucket, FacetType};
pub use sync_state::{ResourceType, SyncState, SyncStatus};
pub use parse::ValidationError;
pub use storage::SqliteStore;
pub use sync::{SyncEngine, SyncOptions, SyncSummary};
pub use query::{QueryEngine, SearchOptions, SearchResults};

/// Result type alias for catalog-cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for catalog-cache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network failure, 5xx or 429 that survived every retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// 4xx other than 429; never retried
    #[error("Client error: HTTP {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A pass for this resource is already running
    #[error("Sync already in progress for {0}")]
    SyncInProgress(ResourceType),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the remote client may retry the failed request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
