//! Sync Engine - incremental, resumable passes from the remote catalog
//!
//! Each resource runs its own pass:
//! 1. Claim the per-resource lock and mark the state row `syncing`
//! 2. Page through the remote resource from the stored cursor
//! 3. Validate each record (safe mode) and upsert the page in one transaction
//! 4. Persist the cursor after every committed page
//! 5. Finish as `success` (cursor cleared) or `error` (cursor kept for resume)
//!
//! Facets are rebuilt from local rows after every companies pass.

pub mod engine;
pub mod lock;

pub use engine::{SyncEngine, DEFAULT_PAGE_SIZE, EVIDENCE_WORKING_SET_LIMIT};
pub use lock::{PassGuard, PassLocks};

use crate::api::CatalogFilters;
use crate::storage::FacetRebuild;
use crate::sync_state::{ResourceType, SyncState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Knobs for one orchestrated sync
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Ignore stored cursor, ETag and `last_sync_at`
    pub force_full_sync: bool,
    /// Refresh evidence for recently synced companies
    pub sync_evidence: bool,
    /// Server-side filters applied to the companies pass
    pub filters: CatalogFilters,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            force_full_sync: false,
            sync_evidence: true,
            filters: CatalogFilters::default(),
        }
    }
}

/// Outcome of one resource pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub resource: ResourceType,
    pub records_synced: u64,
    /// Records dropped by validation
    pub rejected: u64,
    pub pages: u32,
    /// The server answered 304 for the first page
    pub not_modified: bool,
    /// Sub-requests that failed without failing the pass (evidence per company)
    pub failures: u64,
}

impl ResourceSummary {
    pub fn new(resource: ResourceType) -> Self {
        Self {
            resource,
            records_synced: 0,
            rejected: 0,
            pages: 0,
            not_modified: false,
            failures: 0,
        }
    }
}

/// A secondary resource whose pass failed during orchestration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFailure {
    pub resource: ResourceType,
    pub message: String,
}

/// Result of `SyncEngine::sync_universal_catalog`
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub resources: Vec<ResourceSummary>,
    pub facet_buckets: u64,
    pub dataset_version: Option<String>,
    pub failed: Vec<ResourceFailure>,
}

impl SyncSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            resources: Vec::new(),
            facet_buckets: 0,
            dataset_version: None,
            failed: Vec::new(),
        }
    }

    pub fn resource(&self, resource: ResourceType) -> Option<&ResourceSummary> {
        self.resources.iter().find(|r| r.resource == resource)
    }

    pub fn records_synced(&self, resource: ResourceType) -> u64 {
        self.resource(resource).map_or(0, |r| r.records_synced)
    }

    pub fn total_rejected(&self) -> u64 {
        self.resources.iter().map(|r| r.rejected).sum()
    }

    /// Every attempted pass succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record_facets(&mut self, rebuild: FacetRebuild) {
        self.facet_buckets = rebuild.buckets;
        self.dataset_version = rebuild.dataset_version;
    }
}

/// One row of the sync status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceStatus {
    pub state: SyncState,
    pub is_stale: bool,
}
