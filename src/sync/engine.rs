//! Sync engine - orchestrates per-resource passes against the shared store

use super::lock::PassLocks;
use super::{ResourceFailure, ResourceStatus, ResourceSummary, SyncOptions, SyncSummary};
use crate::api::endpoints::endpoint;
use crate::api::{CatalogApi, HealthStatus, ListParams, Paginator};
use crate::catalog::{DriftAlert, Evidence, ScoringRun, ServiceStats};
use crate::parse::{parse_company_record, parse_safe, Contract};
use crate::storage::{timestamp, FacetRebuild, SharedStore, SqliteStore};
use crate::sync_state::{freshness_window, needs_sync, ResourceType, SyncState, SyncStatus};
use crate::ui::{SyncPhase, SyncProgress};
use crate::Result;
use chrono::Utc;
use crossbeam::channel::Sender;
use serde_json::Value;
use std::sync::{Arc, PoisonError};
use std::time::Instant;

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound on companies whose evidence is refreshed in one pass
pub const EVIDENCE_WORKING_SET_LIMIT: u32 = 100;

/// What one page write did
#[derive(Debug, Clone, Copy, Default)]
struct PageWrite {
    written: u64,
    rejected: u64,
}

/// Safe-parse a batch, counting the records that were dropped
fn parse_batch<T: Contract>(items: Vec<Value>) -> (Vec<T>, u64) {
    let total = items.len();
    let parsed: Vec<T> = items.into_iter().filter_map(parse_safe::<T>).collect();
    let rejected = (total - parsed.len()) as u64;
    (parsed, rejected)
}

fn write_companies(store: &SqliteStore, items: Vec<Value>) -> Result<PageWrite> {
    let mut rejected = 0;
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        match parse_company_record(item) {
            Some(record) => {
                rejected += record.rejected_aliases as u64;
                if !record.company.determinism_verified() {
                    tracing::warn!(
                        "Company {} failed the determinism check",
                        record.company.global_company_id
                    );
                }
                records.push(record);
            }
            None => rejected += 1,
        }
    }
    let page = store.upsert_company_page(&records, Utc::now())?;
    Ok(PageWrite {
        written: page.companies,
        rejected,
    })
}

fn write_evidence(store: &SqliteStore, items: Vec<Value>) -> Result<PageWrite> {
    let (evidence, rejected) = parse_batch::<Evidence>(items);
    Ok(PageWrite {
        written: store.upsert_evidence_page(&evidence)?,
        rejected,
    })
}

fn write_drift(store: &SqliteStore, items: Vec<Value>) -> Result<PageWrite> {
    let (alerts, rejected) = parse_batch::<DriftAlert>(items);
    Ok(PageWrite {
        written: store.upsert_drift_page(&alerts)?,
        rejected,
    })
}

fn write_runs(store: &SqliteStore, items: Vec<Value>) -> Result<PageWrite> {
    let (runs, rejected) = parse_batch::<ScoringRun>(items);
    Ok(PageWrite {
        written: store.upsert_run_page(&runs)?,
        rejected,
    })
}

fn write_stats(store: &SqliteStore, items: Vec<Value>) -> Result<PageWrite> {
    let (stats, rejected) = parse_batch::<ServiceStats>(items);
    Ok(PageWrite {
        written: store.upsert_stats_page(&stats)?,
        rejected,
    })
}

type PageWriter = fn(&SqliteStore, Vec<Value>) -> Result<PageWrite>;

/// Drives sync passes. Cheap to share behind an `Arc`.
pub struct SyncEngine {
    store: SharedStore,
    api: Arc<dyn CatalogApi>,
    locks: PassLocks,
    page_size: u32,
    progress: Option<Sender<SyncProgress>>,
}

impl SyncEngine {
    pub fn new(store: SharedStore, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            store,
            api,
            locks: PassLocks::new(),
            page_size: DEFAULT_PAGE_SIZE,
            progress: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Report pass progress on `tx` (consumed by the UI thread)
    pub fn with_progress(mut self, tx: Sender<SyncProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Run synchronous storage work under the store lock
    fn with_store<T>(&self, f: impl FnOnce(&SqliteStore) -> Result<T>) -> Result<T> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        f(&store)
    }

    fn emit(&self, msg: SyncProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(msg);
        }
    }

    // ========== Orchestration ==========

    /// Sync every resource in dependency order.
    ///
    /// A companies failure (or facet rebuild failure) aborts and is returned.
    /// Later passes are independent; their failures are collected in
    /// `SyncSummary::failed` and the remaining passes still run.
    pub async fn sync_universal_catalog(&self, options: &SyncOptions) -> Result<SyncSummary> {
        let clock = Instant::now();
        let mut summary = SyncSummary::new(Utc::now());
        tracing::info!("Starting catalog sync (force_full_sync={})", options.force_full_sync);

        summary.resources.push(self.sync_companies(options).await?);
        summary.record_facets(self.rebuild_facets()?);

        if options.sync_evidence {
            let result = self.sync_evidence(options).await;
            Self::collect(&mut summary, ResourceType::Evidence, result);
        }
        let result = self.sync_drift(options).await;
        Self::collect(&mut summary, ResourceType::Drift, result);
        let result = self.sync_runs(options).await;
        Self::collect(&mut summary, ResourceType::Runs, result);
        let result = self.sync_stats(options).await;
        Self::collect(&mut summary, ResourceType::Stats, result);

        summary.duration = clock.elapsed();
        tracing::info!(
            "Catalog sync finished in {:?}: {} companies, {} rejected, {} failed passes",
            summary.duration,
            summary.records_synced(ResourceType::Companies),
            summary.total_rejected(),
            summary.failed.len()
        );
        Ok(summary)
    }

    fn collect(summary: &mut SyncSummary, resource: ResourceType, result: Result<ResourceSummary>) {
        match result {
            Ok(pass) => summary.resources.push(pass),
            Err(err) => summary.failed.push(ResourceFailure {
                resource,
                message: err.to_string(),
            }),
        }
    }

    // ========== Resource Passes ==========

    pub async fn sync_companies(&self, options: &SyncOptions) -> Result<ResourceSummary> {
        let base = ListParams {
            filters: options.filters.clone(),
            ..ListParams::default()
        };
        self.run_pass(ResourceType::Companies, options, base, write_companies).await
    }

    /// Drift alerts since the last successful drift pass
    pub async fn sync_drift(&self, options: &SyncOptions) -> Result<ResourceSummary> {
        self.run_pass(ResourceType::Drift, options, ListParams::default(), write_drift).await
    }

    pub async fn sync_runs(&self, options: &SyncOptions) -> Result<ResourceSummary> {
        self.run_pass(ResourceType::Runs, options, ListParams::default(), write_runs).await
    }

    pub async fn sync_stats(&self, options: &SyncOptions) -> Result<ResourceSummary> {
        self.run_pass(ResourceType::Stats, options, ListParams::default(), write_stats).await
    }

    /// Evidence for companies synced within the freshness window, paged per company.
    ///
    /// Each company is fetched in full; a company may have joined the working
    /// set after the last evidence pass, so no `since` is sent.
    ///
    /// A failing company is logged and skipped; the pass only ends in `error`
    /// when every company in the working set failed.
    pub async fn sync_evidence(&self, _options: &SyncOptions) -> Result<ResourceSummary> {
        let resource = ResourceType::Evidence;
        let _guard = self.locks.acquire(resource, self.store.clone())?;
        let started_at = Utc::now();
        let mut state = self.with_store(|s| s.sync_state_or_default(resource))?;

        state.sync_status = SyncStatus::Syncing;
        state.error_message = None;
        state.last_cursor = None;
        self.with_store(|s| s.put_sync_state(&state))?;
        self.emit(SyncProgress::Started { resource });

        let cutoff = started_at - freshness_window();
        let working_set =
            self.with_store(|s| s.recently_synced_company_ids(cutoff, EVIDENCE_WORKING_SET_LIMIT))?;
        tracing::info!("Syncing evidence for {} recently synced companies", working_set.len());
        self.emit(SyncProgress::PhaseStarted(SyncPhase::Evidence));

        let mut summary = ResourceSummary::new(resource);
        for company_id in &working_set {
            let params = ListParams {
                company_id: Some(company_id.clone()),
                limit: Some(self.page_size),
                ..ListParams::default()
            };
            if let Err(err) = self.walk(resource, params, None, &mut summary, write_evidence).await {
                tracing::warn!("Evidence sync failed for company {}: {}", company_id, err);
                summary.failures += 1;
            }
        }
        self.emit(SyncProgress::PhaseFinished(SyncPhase::Evidence));

        if !working_set.is_empty() && summary.failures == working_set.len() as u64 {
            let message = format!("evidence fetch failed for all {} companies", working_set.len());
            return Err(self.fail_pass(state, crate::Error::Transport(message)));
        }

        self.complete_pass(state, started_at, &summary, None);
        Ok(summary)
    }

    /// One cursor-walked pass over `resource`
    async fn run_pass(
        &self,
        resource: ResourceType,
        options: &SyncOptions,
        mut params: ListParams,
        write: PageWriter,
    ) -> Result<ResourceSummary> {
        let _guard = self.locks.acquire(resource, self.store.clone())?;
        let started_at = Utc::now();
        let mut state = self.with_store(|s| s.sync_state_or_default(resource))?;

        let resume_cursor = if options.force_full_sync { None } else { state.last_cursor.clone() };
        let mut summary = ResourceSummary::new(resource);
        if resume_cursor.is_some() {
            // Pages committed by the interrupted pass still count
            summary.records_synced = state.records_synced;
        }

        params.limit = Some(self.page_size);
        if !options.force_full_sync {
            params.since = state.last_sync_at.map(timestamp);
            if resume_cursor.is_none() {
                params.etag = state.last_etag.clone();
            }
        }
        params.cursor = resume_cursor;

        state.sync_status = SyncStatus::Syncing;
        state.error_message = None;
        state.last_cursor = params.cursor.clone();
        state.records_synced = summary.records_synced;
        self.with_store(|s| s.put_sync_state(&state))?;
        self.emit(SyncProgress::Started { resource });
        tracing::info!(
            "Starting {} sync{}",
            resource,
            if params.cursor.is_some() { " (resuming from stored cursor)" } else { "" }
        );

        match self.walk(resource, params, Some(&mut state), &mut summary, write).await {
            Ok(etag) => {
                self.complete_pass(state, started_at, &summary, etag);
                Ok(summary)
            }
            Err(err) => Err(self.fail_pass(state, err)),
        }
    }

    /// Fetch and commit pages until the cursor chain ends.
    ///
    /// With `state`, the cursor and running total are persisted after every
    /// committed page. Returns the collection ETag of the first response.
    async fn walk(
        &self,
        resource: ResourceType,
        params: ListParams,
        mut state: Option<&mut SyncState>,
        summary: &mut ResourceSummary,
        write: PageWriter,
    ) -> Result<Option<String>> {
        let mut pager = Paginator::new(self.api.as_ref(), resource, params);
        let mut etag = None;

        while let Some(page) = pager.next().await? {
            if pager.pages_fetched() == 1 {
                etag = page.etag.clone();
            }
            if page.not_modified {
                tracing::debug!("{} not modified since last pass", resource);
                summary.not_modified = true;
                continue;
            }

            let fetched = page.items.len();
            let outcome = self.with_store(|store| write(store, page.items))?;
            summary.records_synced += outcome.written;
            summary.rejected += outcome.rejected;
            summary.pages += 1;

            if let Some(state) = state.as_deref_mut() {
                state.last_cursor = pager.cursor().map(str::to_string);
                state.records_synced = summary.records_synced;
                self.with_store(|s| s.put_sync_state(state))?;
            }

            tracing::debug!(
                "{} page {}: {} fetched, {} written, {} rejected",
                resource,
                pager.pages_fetched(),
                fetched,
                outcome.written,
                outcome.rejected
            );
            self.emit(SyncProgress::Page {
                resource,
                records: summary.records_synced,
                total: page.total,
            });
        }
        Ok(etag)
    }

    fn complete_pass(
        &self,
        mut state: SyncState,
        started_at: chrono::DateTime<Utc>,
        summary: &ResourceSummary,
        etag: Option<String>,
    ) {
        state.sync_status = SyncStatus::Success;
        state.last_sync_at = Some(started_at);
        state.last_cursor = None;
        state.error_message = None;
        state.records_synced = summary.records_synced;
        if etag.is_some() || !summary.not_modified {
            state.last_etag = etag;
        }

        if let Err(e) = self.with_store(|s| s.put_sync_state(&state)) {
            tracing::error!("Failed to record {} pass completion: {}", state.resource_type, e);
        }
        tracing::info!(
            "Finished {} sync: {} records, {} rejected",
            state.resource_type,
            summary.records_synced,
            summary.rejected
        );
        self.emit(SyncProgress::Finished {
            resource: state.resource_type,
            records: summary.records_synced,
            not_modified: summary.not_modified,
        });
    }

    fn fail_pass(&self, mut state: SyncState, err: crate::Error) -> crate::Error {
        tracing::error!("{} sync failed: {}", state.resource_type, err);
        state.sync_status = SyncStatus::Error;
        state.error_message = Some(err.to_string());
        if let Err(e) = self.with_store(|s| s.put_sync_state(&state)) {
            tracing::error!("Failed to record {} pass failure: {}", state.resource_type, e);
        }
        self.emit(SyncProgress::Failed {
            resource: state.resource_type,
            message: err.to_string(),
        });
        err
    }

    // ========== Derived State ==========

    /// Rebuild all materialized facets from the local companies table
    pub fn rebuild_facets(&self) -> Result<FacetRebuild> {
        self.emit(SyncProgress::PhaseStarted(SyncPhase::Facets));
        let rebuild = self.with_store(|s| s.rebuild_facets(Utc::now()))?;
        tracing::info!(
            "Rebuilt {} facet buckets (dataset {})",
            rebuild.buckets,
            rebuild.dataset_version.as_deref().unwrap_or("-")
        );
        self.emit(SyncProgress::PhaseFinished(SyncPhase::Facets));
        Ok(rebuild)
    }

    /// Whether the companies catalog is stale
    pub fn needs_sync(&self) -> Result<bool> {
        self.resource_needs_sync(ResourceType::Companies)
    }

    pub fn resource_needs_sync(&self, resource: ResourceType) -> Result<bool> {
        let state = self.with_store(|s| s.get_sync_state(resource))?;
        Ok(needs_sync(state.as_ref(), Utc::now()))
    }

    /// State and staleness of every remotely backed resource
    pub fn sync_status(&self) -> Result<Vec<ResourceStatus>> {
        let now = Utc::now();
        ResourceType::all()
            .iter()
            .filter(|r| endpoint(**r).is_some())
            .map(|r| {
                let state = self.with_store(|s| s.sync_state_or_default(*r))?;
                let is_stale = state.is_stale(now);
                Ok(ResourceStatus { state, is_stale })
            })
            .collect()
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.api.health().await
    }
}
