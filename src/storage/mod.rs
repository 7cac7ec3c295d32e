//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - companies, company_aliases, evidence, drift_alerts (synced catalog)
//! - scoring_runs, service_stats (synced metadata)
//! - facet_buckets (materialized aggregates)
//! - sync_state (per-resource pass bookkeeping)
//! - workspace_* and search_history (user overlays)
//! - companies_fts, aliases_fts (trigger-maintained full-text indexes)

pub mod catalog;
pub mod facets;
pub mod schema;
pub mod sqlite;
pub mod sync_state;
pub mod workspace;

pub use catalog::{CompanyPage, DriftFilter};
pub use facets::FacetRebuild;
pub use sqlite::{DbStats, MigrationStatus, SqliteStore};

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::{Arc, Mutex};

/// Predicate selecting companies that are neither inactive nor tombstoned
pub(crate) const ACTIVE_COMPANY: &str = "is_active = 1 AND tombstone_at IS NULL";

/// Store handle shared by the sync and query engines.
/// The lock guards synchronous storage work only and is never held across an await.
pub type SharedStore = Arc<Mutex<SqliteStore>>;

pub fn shared(store: SqliteStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Canonical text form of stored timestamps.
/// A single fixed-width format keeps lexical and chronological order identical.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_timestamp() -> String {
    timestamp(Utc::now())
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
