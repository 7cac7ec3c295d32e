//! Sync bookkeeping - one row per synced resource type

use crate::catalog::string_enum;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How long a successful pass keeps a resource fresh, in minutes
pub const FRESHNESS_WINDOW_MINUTES: i64 = 60;

pub fn freshness_window() -> Duration {
    Duration::minutes(FRESHNESS_WINDOW_MINUTES)
}

string_enum! {
    /// Remote resources tracked in `sync_state`
    ResourceType {
        Companies => "companies",
        Evidence => "evidence",
        Scores => "scores",
        Runs => "runs",
        Drift => "drift",
        Stats => "stats",
    }
}

string_enum! {
    /// Per-resource pass state: `pending -> syncing -> {success, error}`
    SyncStatus {
        Pending => "pending",
        Syncing => "syncing",
        Success => "success",
        Error => "error",
    }
}

/// Persisted progress of the most recent pass for one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub resource_type: ResourceType,
    /// Start time of the last successful pass
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_etag: Option<String>,
    /// Cursor of the next page to fetch; only set while a pass is unfinished
    pub last_cursor: Option<String>,
    pub sync_status: SyncStatus,
    pub error_message: Option<String>,
    pub records_synced: u64,
}

impl SyncState {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            last_sync_at: None,
            last_etag: None,
            last_cursor: None,
            sync_status: SyncStatus::Pending,
            error_message: None,
            records_synced: 0,
        }
    }

    /// Never synced, last pass failed, or older than the freshness window
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        if self.sync_status == SyncStatus::Error {
            return true;
        }
        match self.last_sync_at {
            None => true,
            Some(last) => now - last > freshness_window(),
        }
    }
}

/// Staleness for a resource that may have no state row yet
pub fn needs_sync(state: Option<&SyncState>, now: DateTime<Utc>) -> bool {
    state.is_none_or(|s| s.is_stale(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_synced_is_stale() {
        let now = Utc::now();
        assert!(needs_sync(None, now));
        assert!(SyncState::new(ResourceType::Companies).is_stale(now));
    }

    #[test]
    fn test_fresh_success_is_not_stale() {
        let now = Utc::now();
        let mut state = SyncState::new(ResourceType::Companies);
        state.sync_status = SyncStatus::Success;
        state.last_sync_at = Some(now - Duration::minutes(10));
        assert!(!state.is_stale(now));

        state.last_sync_at = Some(now - Duration::minutes(61));
        assert!(state.is_stale(now));
    }

    #[test]
    fn test_error_is_stale_even_when_recent() {
        let now = Utc::now();
        let mut state = SyncState::new(ResourceType::Drift);
        state.sync_status = SyncStatus::Error;
        state.last_sync_at = Some(now);
        assert!(state.is_stale(now));
    }
}
